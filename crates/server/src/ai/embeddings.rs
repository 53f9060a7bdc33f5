//! Text embeddings: remote OpenAI-compatible endpoint or local hashing

use mediquest_core::HashingEmbedder;
use serde::{Deserialize, Serialize};

use super::AiError;
use super::client::ApiError;

/// Embedding backend used to build and query vector indexes
#[derive(Clone)]
pub enum Embedder {
    Remote(RemoteEmbedder),
    Local(HashingEmbedder),
}

impl Embedder {
    /// Remote embedder when a URL is configured, local hashing otherwise
    pub fn from_settings(url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        match url {
            Some(url) => Embedder::Remote(RemoteEmbedder::new(url, model, api_key)),
            None => Embedder::Local(HashingEmbedder::default()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Embedder::Remote(remote) => format!("remote ({})", remote.model),
            Embedder::Local(local) => format!("local hashing ({} dims)", local.dimensions()),
        }
    }

    /// Embed texts, one vector per input in the same order
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            Embedder::Remote(remote) => remote.embed(texts).await,
            Embedder::Local(local) => Ok(local.embed_all(texts)),
        }
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors.pop().ok_or(AiError::EmbeddingCount {
            expected: 1,
            actual: 0,
        })
    }
}

/// Client for `POST {base}/embeddings`
#[derive(Clone)]
pub struct RemoteEmbedder {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl RemoteEmbedder {
    pub fn new(base_url: &str, model: &str, api_key: Option<&str>) -> Self {
        Self {
            http: super::client::http_client(super::client::DEFAULT_TIMEOUT),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.map(str::to_string),
        }
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
        let mut request = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AiError::Api {
                service: "Embedding",
                status,
                message,
            });
        }

        let mut parsed = response.json::<EmbeddingResponse>().await?;
        if parsed.data.len() != texts.len() {
            return Err(AiError::EmbeddingCount {
                expected: texts.len(),
                actual: parsed.data.len(),
            });
        }
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_local_embedder() {
        let embedder = Embedder::from_settings(None, "unused", None);
        let vectors = embedder
            .embed(&["age: int".to_string(), "name: string".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), HashingEmbedder::default().dimensions());
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remote_embedder_orders_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(body_partial_json(json!({"model": "all-MiniLM-L6-v2", "input": ["a", "b"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"index": 1, "embedding": [0.0, 1.0]},
                    {"index": 0, "embedding": [1.0, 0.0]}
                ]
            })))
            .mount(&server)
            .await;

        let embedder = Embedder::from_settings(Some(&server.uri()), "all-MiniLM-L6-v2", None);
        let vectors = embedder
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_remote_embedder_count_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let embedder = Embedder::from_settings(Some(&server.uri()), "m", None);
        let err = embedder.embed_one("a").await.unwrap_err();
        assert!(matches!(err, AiError::EmbeddingCount { expected: 1, actual: 0 }));
    }
}

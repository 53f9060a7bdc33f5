//! Chat-completions client for OpenAI-compatible APIs (Groq by default)

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::AiError;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama3-70b-8192";
/// Upper bound on one model or embedding request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client with a whole-request timeout
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to an HTTP client without timeout");
            reqwest::Client::new()
        })
}

/// Client for a hosted chat-completions endpoint
#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

/// Request body for `/chat/completions`
#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

/// Response from `/chat/completions`
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Error detail returned by OpenAI-compatible APIs
#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    pub message: String,
}

impl LlmClient {
    /// Create a client for Groq with the default model
    pub fn new(api_key: String) -> Self {
        Self {
            http: http_client(DEFAULT_TIMEOUT),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
        }
    }

    /// Point the client at another OpenAI-compatible server
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = http_client(timeout);
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one user prompt with an optional system prompt, return the text reply
    pub async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String, AiError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(prompt));

        let response = self.send(messages).await?;
        extract_text(&response)
    }

    /// Send a full conversation
    pub async fn send(&self, messages: Vec<Message>) -> Result<ApiResponse, AiError> {
        let request = ApiRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: 1024,
        };

        let start = std::time::Instant::now();
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        metrics::counter!(
            "llm_requests_total",
            "model" => self.model.clone(),
            "status" => response.status().as_u16().to_string()
        )
        .increment(1);
        metrics::histogram!("llm_request_duration_seconds", "model" => self.model.clone())
            .record(start.elapsed().as_secs_f64());

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AiError::Api {
                service: "LLM",
                status,
                message,
            });
        }

        let parsed = response.json::<ApiResponse>().await?;
        if let Some(reason) = parsed.choices.first().and_then(|c| c.finish_reason.as_deref()) {
            tracing::debug!(model = %self.model, finish_reason = reason, "Completion received");
        }
        Ok(parsed)
    }
}

/// First non-empty text choice of a response
pub fn extract_text(response: &ApiResponse) -> Result<String, AiError> {
    response
        .choices
        .iter()
        .filter_map(|choice| choice.message.content.as_deref())
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or(AiError::EmptyCompletion)
}

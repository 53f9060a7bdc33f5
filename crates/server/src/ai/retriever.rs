//! Index construction and top-k context retrieval

use mediquest_core::{IndexedDocument, VectorIndex, record_to_text};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use super::{AiError, Embedder};

/// Embed `lines` into a fresh index
pub async fn build_index(embedder: &Embedder, lines: Vec<String>) -> Result<VectorIndex, AiError> {
    let vectors = embedder.embed(&lines).await?;
    Ok(VectorIndex::from_embeddings(lines, vectors)?)
}

/// Texts of the `k` documents closest to `question`
pub async fn retrieve(
    embedder: &Embedder,
    index: &VectorIndex,
    question: &str,
    k: usize,
) -> Result<Vec<String>, AiError> {
    retrieve_where(embedder, index, question, k, |_| true).await
}

/// Like [`retrieve`], skipping documents `keep` rejects
pub async fn retrieve_where<F>(
    embedder: &Embedder,
    index: &VectorIndex,
    question: &str,
    k: usize,
    keep: F,
) -> Result<Vec<String>, AiError>
where
    F: Fn(&IndexedDocument) -> bool,
{
    if index.is_empty() {
        return Ok(Vec::new());
    }
    let query = embedder.embed_one(question).await?;
    let hits = index.search(&query, index.len())?;
    Ok(hits
        .into_iter()
        .filter(|h| keep(h.document))
        .take(k)
        .map(|h| h.document.text.clone())
        .collect())
}

/// Index stored patient records, one document per record tagged with its `patient_id`
pub async fn build_patient_index(
    embedder: &Embedder,
    records: &[JsonValue],
) -> Result<VectorIndex, AiError> {
    let mut texts = Vec::with_capacity(records.len());
    let mut ids = Vec::with_capacity(records.len());
    for record in records {
        let Some(map) = record.as_object() else {
            continue;
        };
        texts.push(record_to_text(map));
        ids.push(
            map.get("patient_id")
                .and_then(JsonValue::as_str)
                .unwrap_or("Unknown")
                .to_string(),
        );
    }

    let vectors = embedder.embed(&texts).await?;
    if vectors.len() != texts.len() {
        return Err(AiError::EmbeddingCount {
            expected: texts.len(),
            actual: vectors.len(),
        });
    }

    let dimensions = vectors.first().map(Vec::len).unwrap_or(0);
    let mut index = VectorIndex::new(dimensions);
    for ((text, id), vector) in texts.into_iter().zip(ids).zip(vectors) {
        let metadata = BTreeMap::from([("patient_id".to_string(), id)]);
        index.insert(text, metadata, vector)?;
    }

    tracing::info!(documents = index.len(), "Built patient record index");
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_build_patient_index() {
        let embedder = Embedder::from_settings(None, "", None);
        let records = vec![
            json!({"_id": {"$oid": "1"}, "patient_id": "PAT1000", "asthma": "yes"}),
            json!({"patient_id": "PAT1001", "asthma": "no"}),
            json!("not a record"),
        ];
        let index = build_patient_index(&embedder, &records).await.unwrap();

        assert_eq!(index.len(), 2);
        let first = &index.documents()[0];
        assert_eq!(first.text, "patient_id: PAT1000\nasthma: yes");
        assert_eq!(first.metadata["patient_id"], "PAT1000");
    }

    #[tokio::test]
    async fn test_retrieve_top_k() {
        let embedder = Embedder::from_settings(None, "", None);
        let lines = vec![
            "patient_records.age: int".to_string(),
            "patient_records.asthma: string".to_string(),
            "patient_records.contact: string".to_string(),
        ];
        let index = build_index(&embedder, lines).await.unwrap();

        let hits = retrieve(&embedder, &index, "patients with asthma", 1).await.unwrap();
        assert_eq!(hits, vec!["patient_records.asthma: string"]);

        let all = retrieve(&embedder, &index, "anything", 10).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_retrieve_where_filters_by_patient() {
        let embedder = Embedder::from_settings(None, "", None);
        let records = vec![
            json!({"patient_id": "PAT1000", "asthma": "yes"}),
            json!({"patient_id": "PAT1001", "asthma": "yes"}),
        ];
        let index = build_patient_index(&embedder, &records).await.unwrap();
        let hits = retrieve_where(&embedder, &index, "asthma", 4, |doc| {
            doc.metadata.get("patient_id").map(String::as_str) == Some("PAT1001")
        })
        .await
        .unwrap();
        assert_eq!(hits, vec!["patient_id: PAT1001\nasthma: yes"]);
    }

    #[tokio::test]
    async fn test_retrieve_from_empty_index() {
        let embedder = Embedder::from_settings(None, "", None);
        let index = build_index(&embedder, Vec::new()).await.unwrap();
        assert!(retrieve(&embedder, &index, "q", 4).await.unwrap().is_empty());
    }
}

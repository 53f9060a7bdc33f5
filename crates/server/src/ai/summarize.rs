//! Natural-language summaries of JSON documents

use mediquest_core::{flatten_json, prompt};
use serde_json::Value as JsonValue;

use super::{AiError, Embedder, LlmClient, retriever};

pub const SUMMARY_TOP_K: usize = 3;

/// Summarize a document as a formal profile paragraph
pub async fn json_to_text(
    llm: &LlmClient,
    embedder: &Embedder,
    document: &JsonValue,
) -> Result<String, AiError> {
    let lines = flatten_json(document);
    if lines.is_empty() {
        return Err(AiError::EmptyDocument);
    }

    let index = retriever::build_index(embedder, lines).await?;
    let context =
        retriever::retrieve(embedder, &index, prompt::SUMMARY_QUESTION, SUMMARY_TOP_K).await?;

    llm.complete(None, &prompt::summary_prompt(&prompt::join_context(&context)))
        .await
}

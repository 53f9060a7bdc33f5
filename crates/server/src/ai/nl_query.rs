//! Natural language to MongoDB aggregation query

use mediquest_core::{flatten_schema, prompt};
use serde_json::Value as JsonValue;

use super::{AiError, Embedder, LlmClient, retriever};

/// Schema lines handed to the model per question
pub const SCHEMA_TOP_K: usize = 4;

/// Ask the model for a query answering `question` over `schema`.
///
/// The schema is flattened to `path: type` lines, the lines closest to the
/// question are retrieved, and the model's raw answer is returned unrepaired.
pub async fn schema_to_mongo(
    llm: &LlmClient,
    embedder: &Embedder,
    question: &str,
    schema: &JsonValue,
) -> Result<String, AiError> {
    let lines = flatten_schema(schema);
    if lines.is_empty() {
        return Err(AiError::EmptySchema);
    }

    let index = retriever::build_index(embedder, lines).await?;
    let context = retriever::retrieve(embedder, &index, question, SCHEMA_TOP_K).await?;
    tracing::debug!(fields = ?context, "Retrieved schema context");

    let prompt = prompt::mongo_query_prompt(&prompt::join_context(&context), question);
    llm.complete(None, &prompt).await
}

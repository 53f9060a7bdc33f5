//! Question answering over indexed patient records

use mediquest_core::{VectorIndex, prompt};

use super::{AiError, Embedder, LlmClient, retriever};

pub const CHAT_TOP_K: usize = 4;

/// Answer `question` from the records closest to it.
///
/// With `patients` set, only records tagged with one of those ids are used.
pub async fn answer(
    llm: &LlmClient,
    embedder: &Embedder,
    index: &VectorIndex,
    question: &str,
    patients: Option<&[String]>,
) -> Result<String, AiError> {
    let records = retriever::retrieve_where(embedder, index, question, CHAT_TOP_K, |doc| {
        patients.is_none_or(|ids| {
            doc.metadata
                .get("patient_id")
                .is_some_and(|id| ids.contains(id))
        })
    })
    .await?;
    tracing::debug!(records = records.len(), "Retrieved patient records for chat");

    llm.complete(None, &prompt::records_prompt(&prompt::join_context(&records), question))
        .await
}

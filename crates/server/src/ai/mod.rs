//! LLM features: query generation, summaries and record chat

pub mod chat;
pub mod client;
pub mod embeddings;
pub mod nl_query;
pub mod retriever;
pub mod summarize;

pub use client::LlmClient;
pub use embeddings::Embedder;

use mediquest_core::RetrievalError;
use thiserror::Error;

/// Errors from the LLM and embedding services
#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} API error ({status}): {message}")]
    Api {
        service: &'static str,
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("No text content in model response")]
    EmptyCompletion,

    #[error("Embedding service returned {actual} vectors for {expected} inputs")]
    EmbeddingCount { expected: usize, actual: usize },

    #[error("Schema has no fields to retrieve from")]
    EmptySchema,

    #[error("Document has no fields to summarize")]
    EmptyDocument,

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

use thiserror::Error;

/// Failures while turning an LLM response into an executable pipeline
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Couldn't extract pipeline: expected `db.<collection>.aggregate([...])`, got: {0}")]
    NotAnAggregation(String),

    #[error("Repaired pipeline is not valid JSON ({source}): {cleaned}")]
    InvalidPipeline {
        cleaned: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Aggregation pipeline must be a JSON array, got: {0}")]
    NotAnArray(String),

    #[error("Pipeline stage `{0}` writes to the database and is not allowed")]
    WriteStage(String),

    #[error("Pipeline may not read collection `{0}`")]
    RestrictedCollection(String),
}

/// Vector index errors
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Vector has {actual} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Index I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Record validation errors
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Age must be between 0 and 120, got {0}")]
    AgeOutOfRange(i64),

    #[error("Invalid role: {0}")]
    InvalidRole(String),
}

//! Application error handling

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mediquest_core::{Outcome, QueryError, RecordError};

use crate::ai::AiError;
use crate::db::ExecutionError;

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    TooManyRequests(String),
    /// The model's query could not be repaired into a pipeline
    Unprocessable(String),
    /// LLM or embedding service failed
    Upstream(String),
    /// A feature is not configured (no API key, no index)
    Unavailable(String),
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg)
            | AppError::TooManyRequests(msg)
            | AppError::Unprocessable(msg)
            | AppError::Upstream(msg)
            | AppError::Unavailable(msg) => msg,
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                msg
            }
        };

        (status, Json(Outcome::failure(&message))).into_response()
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::Internal(format!("Database error: {}", err))
    }
}

impl From<RecordError> for AppError {
    fn from(err: RecordError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<ExecutionError> for AppError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::Query(
                e @ (QueryError::WriteStage(_) | QueryError::RestrictedCollection(_)),
            ) => AppError::Forbidden(e.to_string()),
            ExecutionError::Query(e) => AppError::Unprocessable(e.to_string()),
            ExecutionError::Encode(e) => AppError::Unprocessable(e.to_string()),
            ExecutionError::Database(e) => AppError::from(e),
        }
    }
}

impl From<AiError> for AppError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::EmptySchema | AiError::EmptyDocument => AppError::BadRequest(err.to_string()),
            AiError::Retrieval(e) => AppError::Internal(e.to_string()),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

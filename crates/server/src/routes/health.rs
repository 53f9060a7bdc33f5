//! Health check endpoint

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// GET /health - Ping MongoDB
pub async fn check(State(state): State<AppState>) -> impl IntoResponse {
    let database = state.db.name().to_string();
    match crate::db::ping(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                database,
                reason: None,
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    database,
                    reason: Some(format!("Database connection failed: {}", e)),
                }),
            )
        }
    }
}

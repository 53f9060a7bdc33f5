pub mod auth;
pub mod dashboard;
pub mod health;
pub mod metrics;
pub mod query;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Build session-protected EHR routes
pub fn ehr_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(auth::me))
        .route(
            "/doctor/patients",
            get(dashboard::doctor_patients).post(dashboard::add_patient),
        )
        .route("/patients/{patient_id}", get(dashboard::patient))
        .route("/admin/doctors", post(dashboard::add_doctor))
        .route("/admin/index", post(query::rebuild_index))
        .route("/query", post(query::nl_query))
        .route("/query/execute", post(query::execute))
        .route("/chat", post(query::chat))
        .route("/summarize", post(query::summarize))
}

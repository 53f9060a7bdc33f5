//! mediquest-server library crate
//!
//! Exposes `build_app` plus the database and AI layers shared with the CLI.
//! The HTTP binary entrypoint is in `main.rs`.

pub mod ai;
pub mod config;
pub mod db;
mod error;
mod middleware;
mod routes;
pub mod session;
pub mod state;

use axum::{
    Extension, Router, middleware as axum_mw,
    routing::{get, post},
};
use mongodb::Database;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::AppError;

use config::Config;
use session::SessionStore;
use state::AppState;

/// Build the full application router with all routes and middleware.
///
/// Kept out of `main()` so integration tests can construct the app
/// without binding to a TCP port.
pub fn build_app(db: Database, config: &Config) -> Router {
    let sessions = SessionStore::with_ttl_secs(config.session_ttl_secs);
    let rate_limiter = middleware::create_rate_limiter(config.rate_limit_rps);
    let login_limiter = middleware::create_login_rate_limiter(config.login_rate_limit_per_minute);
    spawn_pruning(sessions.clone(), vec![rate_limiter.clone(), login_limiter.0.clone()]);

    // None when GROQ_API_KEY is unset; LLM routes answer 503
    let llm_client: Option<ai::LlmClient> = config.groq_api_key.as_ref().map(|key| {
        ai::LlmClient::new(key.clone())
            .with_base_url(&config.llm_base_url)
            .with_model(&config.llm_model)
            .with_timeout(Duration::from_secs(config.llm_timeout_secs))
    });

    // Session-protected routes
    let protected_routes = routes::ehr_routes()
        .layer(axum_mw::from_fn(middleware::audit_middleware))
        .layer(axum_mw::from_fn(middleware::session_middleware))
        .layer(Extension(llm_client))
        .layer(axum_mw::from_fn(middleware::rate_limit_middleware))
        .layer(Extension(rate_limiter));

    // build_recorder() + set_global_recorder() so a second build_app()
    // (integration tests) keeps working with its own handle.
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let prometheus_handle = recorder.handle();
    let _ = metrics::set_global_recorder(recorder);

    let public_routes = Router::new()
        .route("/", get(routes::auth::index))
        .route(
            "/login",
            post(routes::auth::login)
                .layer::<_, std::convert::Infallible>(axum_mw::from_fn(
                    middleware::login_rate_limit_middleware,
                ))
                .layer::<_, std::convert::Infallible>(Extension(login_limiter)),
        )
        .route("/logout", get(routes::auth::logout))
        .route("/health", get(routes::health::check))
        .route("/metrics", get(routes::metrics::get))
        .layer(Extension(prometheus_handle));

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(AppState::new(db, config))
        .layer(Extension(sessions))
        .layer(axum_mw::from_fn(middleware::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum_mw::from_fn(middleware::metrics_middleware))
}

/// How often expired sessions and idle rate-limit buckets are dropped
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically drop expired sessions and idle limiter keys.
///
/// Does nothing outside a Tokio runtime.
fn spawn_pruning(sessions: SessionStore, limiters: Vec<middleware::SharedRateLimiter>) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        return;
    };
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let expired = sessions.prune().await;
            limiters.iter().for_each(middleware::prune_limiter);
            if expired > 0 {
                tracing::debug!(expired, "Pruned expired sessions");
            }
        }
    });
}

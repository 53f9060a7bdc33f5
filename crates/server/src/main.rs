//! mediquest-server: EHR query service binary entrypoint.

use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediquest_server::config::Config;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = Config::from_env();

    let db = match mediquest_server::db::connect(&config.mongo_uri, &config.db_name).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "MongoDB connection failed");
            std::process::exit(1);
        }
    };
    tracing::info!(database = %config.db_name, collection = %config.collection, "Connected to MongoDB");

    if config.groq_api_key.is_some() {
        tracing::info!(model = %config.llm_model, "LLM configured, query generation enabled");
    } else {
        tracing::warn!("GROQ_API_KEY not set, query generation, chat and summaries disabled");
    }
    tracing::info!(
        "Rate limiting: {} requests/second, {} logins/minute",
        config.rate_limit_rps,
        config.login_rate_limit_per_minute
    );

    let app = mediquest_server::build_app(db, &config);

    let addr: SocketAddr = match config.bind_address.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(address = %config.bind_address, error = %e, "Invalid bind address");
            std::process::exit(1);
        }
    };
    tracing::info!("Starting MediQuest server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    tracing::info!("Server shutdown complete");
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

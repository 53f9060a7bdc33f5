//! HTTP middleware

pub mod audit;
pub mod auth;
pub mod metrics;
pub mod rate_limit;
pub mod request_id;

pub use audit::audit_middleware;
pub use auth::session_middleware;
pub use metrics::metrics_middleware;
pub use rate_limit::{
    LoginRateLimiter, SharedRateLimiter, create_login_rate_limiter, create_rate_limiter,
    login_rate_limit_middleware, prune_limiter, rate_limit_middleware,
};
pub use request_id::request_id_middleware;

//! Rate limiting: per session for the API, per client address for login

use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::AppError;
use crate::session::session_token;

/// Requests with no session cookie (or no known address) share this bucket
const ANONYMOUS_KEY: &str = "anonymous";

/// One token bucket per key
pub type SharedRateLimiter = Arc<DefaultKeyedRateLimiter<String>>;

/// Limiter for `POST /login`, keyed by client address
#[derive(Clone)]
pub struct LoginRateLimiter(pub SharedRateLimiter);

/// Create a limiter allowing `requests_per_second` per session (at least 1)
pub fn create_rate_limiter(requests_per_second: u32) -> SharedRateLimiter {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::keyed(Quota::per_second(rps)))
}

/// Create a limiter allowing `attempts_per_minute` logins per client (at least 1)
pub fn create_login_rate_limiter(attempts_per_minute: u32) -> LoginRateLimiter {
    let rpm = NonZeroU32::new(attempts_per_minute).unwrap_or(NonZeroU32::MIN);
    LoginRateLimiter(Arc::new(RateLimiter::keyed(Quota::per_minute(rpm))))
}

/// Reject with 429 once the caller's session quota is spent
pub async fn rate_limit_middleware(request: Request<Body>, next: Next) -> Response {
    if let Some(limiter) = request.extensions().get::<SharedRateLimiter>() {
        let key = session_token(request.headers()).unwrap_or_else(|| ANONYMOUS_KEY.to_string());
        if limiter.check_key(&key).is_err() {
            tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
            return AppError::TooManyRequests(
                "Too many requests. Please slow down and try again.".to_string(),
            )
            .into_response();
        }
    }

    next.run(request).await
}

/// Reject with 429 once a client has spent its login attempts
pub async fn login_rate_limit_middleware(request: Request<Body>, next: Next) -> Response {
    if let Some(LoginRateLimiter(limiter)) = request.extensions().get::<LoginRateLimiter>() {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        let key = client_key(request.headers(), peer);
        if limiter.check_key(&key).is_err() {
            tracing::warn!(target: "audit", client = %key, "Login rate limit exceeded");
            return AppError::TooManyRequests(
                "Too many login attempts. Please wait a minute and try again.".to_string(),
            )
            .into_response();
        }
    }

    next.run(request).await
}

/// First `X-Forwarded-For` hop, else the peer address
fn client_key(headers: &HeaderMap, peer: Option<String>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or(peer)
        .unwrap_or_else(|| ANONYMOUS_KEY.to_string())
}

/// Forget buckets that have refilled, so idle keys do not pile up
pub fn prune_limiter(limiter: &SharedRateLimiter) {
    limiter.retain_recent();
    limiter.shrink_to_fit();
}

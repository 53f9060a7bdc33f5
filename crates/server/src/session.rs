//! Cookie sessions held in memory

use axum::http::{HeaderMap, header};
use chrono::{DateTime, Duration, Utc};
use mediquest_core::Role;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::AppError;

pub const SESSION_COOKIE: &str = "mediquest_session";

/// A logged-in user
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub role: Role,
    /// Login identifier: admin username, doctor id or patient id
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(role: Role, username: &str) -> Self {
        Self {
            role,
            username: username.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Fail with 403 unless the session has one of `roles`
    pub fn require(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "{} accounts cannot access this resource.",
                self.role
            )))
        }
    }
}

/// Default lifetime of a session, in seconds
pub const DEFAULT_SESSION_TTL_SECS: i64 = 12 * 60 * 60;

/// Session store shared across requests; sessions expire `ttl` after login
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(Duration::seconds(DEFAULT_SESSION_TTL_SECS))
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Store with a TTL in seconds; out-of-range values fall back to the default
    pub fn with_ttl_secs(secs: u64) -> Self {
        let ttl = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or_else(|| Duration::seconds(DEFAULT_SESSION_TTL_SECS));
        Self::with_ttl(ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.created_at >= self.ttl
    }

    /// Store a session and return its token; expired sessions are pruned first
    pub async fn create(&self, session: Session) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !self.is_expired(s, now));
        sessions.insert(token.clone(), session);
        token
    }

    /// Live session for `token`; an expired one is evicted
    pub async fn get(&self, token: &str) -> Option<Session> {
        let session = self.sessions.read().await.get(token).cloned()?;
        if self.is_expired(&session, Utc::now()) {
            self.sessions.write().await.remove(token);
            return None;
        }
        Some(session)
    }

    pub async fn remove(&self, token: &str) -> Option<Session> {
        self.sessions.write().await.remove(token)
    }

    /// Drop every expired session, returning how many were removed
    pub async fn prune(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, now));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Session token from the request's `Cookie` headers
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value establishing a session for `ttl`
pub fn session_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        ttl.num_seconds()
    )
}

/// `Set-Cookie` value expiring the session cookie
pub fn cleared_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; mediquest_session=abc123; other=1"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_session_token_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("mediquest_session=xyz"));
        assert_eq!(session_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_session_token_missing_or_empty() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);
        headers.insert(header::COOKIE, HeaderValue::from_static("mediquest_session="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_require_role() {
        let session = Session::new(Role::Doctor, "DOC1000");
        assert!(session.require(&[Role::Doctor, Role::Admin]).is_ok());
        assert!(matches!(
            session.require(&[Role::Admin]),
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_store_lifecycle() {
        let store = SessionStore::new();
        let token = store.create(Session::new(Role::Admin, "root")).await;

        let session = store.get(&token).await.unwrap();
        assert_eq!(session.username, "root");
        assert_eq!(session.role, Role::Admin);

        assert!(store.remove(&token).await.is_some());
        assert!(store.get(&token).await.is_none());
    }

    fn aged(role: Role, username: &str, age: Duration) -> Session {
        Session {
            created_at: Utc::now() - age,
            ..Session::new(role, username)
        }
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_evicted() {
        let store = SessionStore::with_ttl(Duration::hours(1));
        let token = store
            .create(aged(Role::Doctor, "DOC1000", Duration::hours(2)))
            .await;

        assert!(store.get(&token).await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_create_prunes_expired_sessions() {
        let store = SessionStore::with_ttl(Duration::hours(1));
        store
            .create(aged(Role::Admin, "old", Duration::hours(3)))
            .await;
        store
            .create(aged(Role::Admin, "older", Duration::hours(4)))
            .await;
        let live = store.create(Session::new(Role::Admin, "root")).await;

        assert_eq!(store.len().await, 1);
        assert!(store.get(&live).await.is_some());
    }

    #[tokio::test]
    async fn test_prune() {
        let store = SessionStore::with_ttl(Duration::minutes(30));
        store
            .create(Session::new(Role::Patient, "PAT1000"))
            .await;
        store.sessions.write().await.insert(
            "stale".to_string(),
            aged(Role::Patient, "PAT1001", Duration::hours(1)),
        );
        assert_eq!(store.prune().await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn test_ttl_from_seconds() {
        assert_eq!(SessionStore::with_ttl_secs(90).ttl(), Duration::seconds(90));
        assert_eq!(
            SessionStore::with_ttl_secs(u64::MAX).ttl(),
            Duration::seconds(DEFAULT_SESSION_TTL_SECS)
        );
    }

    #[test]
    fn test_session_cookie_max_age() {
        assert_eq!(
            session_cookie("abc", Duration::hours(1)),
            "mediquest_session=abc; Path=/; Max-Age=3600; HttpOnly; SameSite=Lax"
        );
    }
}

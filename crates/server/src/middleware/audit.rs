//! Audit trail for record access and account changes

use axum::{body::Body, extract::Request, http::Method, middleware::Next, response::Response};

use super::request_id::RequestId;
use crate::session::Session;

/// Audit action for a protected request, if it is one worth recording.
///
/// Every patient record read is logged alongside the writes.
pub fn audit_action(method: &Method, path: &str) -> Option<&'static str> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let action = match (method, segments.as_slice()) {
        (&Method::GET, ["patients", _]) => "patient.read",
        (&Method::GET, ["doctor", "patients"]) => "patient.list",
        (&Method::POST, ["doctor", "patients"]) => "patient.create",
        (&Method::POST, ["admin", "doctors"]) => "doctor.create",
        (&Method::POST, ["admin", "index"]) => "index.rebuild",
        (&Method::POST, ["query"]) => "query.generate",
        (&Method::POST, ["query", "execute"]) => "query.execute",
        (&Method::POST, ["chat"]) => "records.chat",
        (&Method::POST, ["summarize"]) => "document.summarize",
        (&Method::POST, _) | (&Method::PUT, _) | (&Method::DELETE, _) => "mutation",
        _ => return None,
    };
    Some(action)
}

pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    let Some(action) = audit_action(request.method(), request.uri().path()) else {
        return next.run(request).await;
    };

    let path = request.uri().path().to_string();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_else(|| "unknown".to_string());
    let (role, user) = request
        .extensions()
        .get::<Session>()
        .map(|s| (s.role.to_string(), s.username.clone()))
        .unwrap_or_else(|| ("anonymous".to_string(), "-".to_string()));

    let response = next.run(request).await;

    tracing::info!(
        target: "audit",
        request_id = %request_id,
        action = action,
        role = %role,
        user = %user,
        path = %path,
        status = response.status().as_u16(),
        "EHR access"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_action() {
        assert_eq!(audit_action(&Method::GET, "/patients/PAT1000"), Some("patient.read"));
        assert_eq!(audit_action(&Method::POST, "/doctor/patients"), Some("patient.create"));
        assert_eq!(audit_action(&Method::POST, "/query/execute"), Some("query.execute"));
        assert_eq!(audit_action(&Method::POST, "/summarize"), Some("document.summarize"));
        assert_eq!(audit_action(&Method::POST, "/chat"), Some("records.chat"));
        assert_eq!(audit_action(&Method::DELETE, "/doctor/patients/PAT1000"), Some("mutation"));
        assert_eq!(audit_action(&Method::GET, "/me"), None);
    }
}

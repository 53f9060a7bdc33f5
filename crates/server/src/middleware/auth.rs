//! Session authentication for protected routes

use axum::{
    body::Body,
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::session::{SessionStore, session_token};

/// Resolve the session cookie and attach the [`Session`](crate::session::Session)
/// to the request, or reject with 401.
pub async fn session_middleware(mut request: Request<Body>, next: Next) -> Response {
    let Some(store) = request.extensions().get::<SessionStore>().cloned() else {
        return AppError::Internal("Session store not configured".to_string()).into_response();
    };

    let session = match session_token(request.headers()) {
        Some(token) => store.get(&token).await,
        None => None,
    };

    match session {
        Some(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        None => AppError::Unauthorized("Login required.".to_string()).into_response(),
    }
}

//! Login page, login/logout and the current session

use axum::{
    Extension, Form, Json,
    extract::State,
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Redirect},
};
use mediquest_core::{Outcome, Role};
use serde::Deserialize;

use crate::error::AppError;
use crate::session::{Session, SessionStore, cleared_cookie, session_cookie, session_token};
use crate::state::AppState;

/// Form fields posted by the login page
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub role: String,
    pub username: String,
    pub password: String,
}

/// GET / - Login page
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}

/// POST /login - Check credentials for the role and open a session
pub async fn login(
    State(state): State<AppState>,
    Extension(sessions): Extension<SessionStore>,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    let username = form.username.trim();
    let password = form.password.trim();
    if form.role.trim().is_empty() || username.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest("All fields are required.".to_string()));
    }

    let role: Role = form
        .role
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid role.".to_string()))?;

    if !state
        .repository()
        .verify_login(role, username, password)
        .await?
    {
        tracing::warn!(target: "audit", role = %role, user = %username, "Login rejected");
        return Err(AppError::Unauthorized(
            "Invalid username or password.".to_string(),
        ));
    }

    let token = sessions.create(Session::new(role, username)).await;
    tracing::info!(target: "audit", role = %role, user = %username, "Login succeeded");

    Ok((
        [(header::SET_COOKIE, session_cookie(&token, sessions.ttl()))],
        Json(Outcome::logged_in(role, username)),
    ))
}

/// GET /logout - Drop the session and return to the login page
pub async fn logout(
    Extension(sessions): Extension<SessionStore>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(token) = session_token(&headers) {
        sessions.remove(&token).await;
    }
    ([(header::SET_COOKIE, cleared_cookie())], Redirect::to("/"))
}

/// GET /me - Current session
pub async fn me(Extension(session): Extension<Session>) -> Json<Session> {
    Json(session)
}

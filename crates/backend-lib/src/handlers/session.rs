// ============================
// crates/backend-lib/src/handlers/session.rs
// ============================
//! Login, logout and re-authentication.
use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Extension, Form, Json,
};
use serde::Serialize;
use taskcollect_common::LoginRequest;
use tracing::info;

use crate::auth::{clear_cookie, extract_token};
use crate::error::AppError;
use crate::middleware::{ClientIp, CurrentSession};
use crate::AppState;

/// Fields expected by `POST /auth`
#[derive(Debug, Serialize)]
pub struct LoginForm {
    pub action: &'static str,
    pub fields: [&'static str; 4],
    pub schools: Vec<String>,
}

/// Describe the login form
pub async fn login_page(State(state): State<AppState>) -> Json<LoginForm> {
    let mut schools: Vec<String> = state.orchestrator.schools().map(str::to_string).collect();
    schools.sort();
    Json(LoginForm {
        action: "/auth",
        fields: ["school", "email", "usr", "pwd"],
        schools,
    })
}

/// Authenticate the submitted form and set the session cookie
pub async fn login(
    State(state): State<AppState>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    Form(req): Form<LoginRequest>,
) -> Result<Response, AppError> {
    if let Some(ip) = ip {
        if !state.login_limiter.allows(ip) {
            return Err(AppError::AuthRateLimited);
        }
    }

    match state.orchestrator.login(&req).await {
        Ok(outcome) => {
            if let Some(ip) = ip {
                state.login_limiter.record_success(ip);
            }
            Ok(([(SET_COOKIE, outcome.cookie)], Redirect::to("/")).into_response())
        },
        Err(err) => {
            if let (Some(ip), AppError::AuthFailed(_)) = (ip, &err) {
                state.login_limiter.record_failure(ip);
            }
            Err(err)
        },
    }
}

/// End the presented session, if any, and return to the login page
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = extract_token(&headers) {
        state.orchestrator.logout(&token);
        info!("user logged out");
    }
    ([(SET_COOKIE, clear_cookie())], Redirect::to("/login")).into_response()
}

#[derive(Debug, Serialize)]
pub struct Reauthenticated {
    pub platforms: Vec<String>,
}

/// Refresh the site tokens of the current session
pub async fn reauth(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Json<Reauthenticated>, AppError> {
    let user = state.orchestrator.reauthenticate(&session.token).await?;
    let mut platforms: Vec<String> = user.site_tokens.into_keys().collect();
    platforms.sort();
    Ok(Json(Reauthenticated { platforms }))
}

// crates/backend-lib/src/middleware/session.rs

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use taskcollect_common::User;

use crate::auth::{extract_token, SessionError};
use crate::validation::validate_session_token;
use crate::{error::AppError, AppState};

/// The session presented with a request
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token: String,
    pub user: User,
}

/// Resolve the `token` cookie into a [`CurrentSession`] extension.
///
/// Requests without a live session, or with a malformed token, are
/// redirected to the login page.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(request.headers()).ok_or(SessionError::NoSession)?;
    validate_session_token(&token).map_err(|_| SessionError::NoSession)?;
    let user = state.orchestrator.resolve(&token)?;
    request.extensions_mut().insert(CurrentSession { token, user });
    Ok(next.run(request).await)
}

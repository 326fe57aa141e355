// ============================
// crates/backend-lib/src/auth/cookie.rs
// ============================
//! Session cookie formatting and parsing.
use axum::http::{header::COOKIE, HeaderMap};

use super::SessionToken;

pub const COOKIE_NAME: &str = "token";

/// `Expires` attribute format (RFC 1123, always GMT)
const EXPIRES_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(session: &SessionToken) -> String {
    format!(
        "{COOKIE_NAME}={}; Expires={}; Path=/; HttpOnly",
        session.token,
        session.expires.format(EXPIRES_FORMAT)
    )
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_cookie() -> String {
    format!("{COOKIE_NAME}=; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/; HttpOnly")
}

/// Session token from the request's `Cookie` headers, if any
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == COOKIE_NAME && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

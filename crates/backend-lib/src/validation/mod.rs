// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Validation of identifiers taken from requests.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const MAX_SCHOOL_LENGTH: usize = 32;
const MAX_PLATFORM_LENGTH: usize = 32;
const MAX_ITEM_ID_LENGTH: usize = 256;
const MAX_CREDENTIAL_LENGTH: usize = 256;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit
const SESSION_TOKEN_LENGTH: usize = 43; // 32 bytes, base64 without padding

static SCHOOL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap());
static PLATFORM_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap());
// platform ids may be opaque (numeric, base64, or `a/b` paths on some sites)
static ITEM_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._~:=+/-]+$").unwrap());
static SESSION_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());
static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid school: {0}")]
    InvalidSchool(String),

    #[error("invalid platform: {0}")]
    InvalidPlatform(String),

    #[error("invalid id: {0}")]
    InvalidItemId(String),

    #[error("invalid session token: {0}")]
    InvalidSessionToken(String),

    #[error("invalid email: {0}")]
    InvalidEmail(String),

    #[error("{0} must not be empty")]
    Missing(&'static str),

    #[error("{0} is too long")]
    TooLong(&'static str),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a school id (lowercase, digits, `-` and `_`)
pub fn validate_school(school: &str) -> ValidationResult<&str> {
    if school.is_empty() {
        return Err(ValidationError::Missing("school"));
    }
    if school.len() > MAX_SCHOOL_LENGTH {
        return Err(ValidationError::TooLong("school"));
    }
    if !SCHOOL_REGEX.is_match(school) {
        return Err(ValidationError::InvalidSchool(school.to_string()));
    }
    Ok(school)
}

/// Validate a platform name as it appears in a URL
pub fn validate_platform(platform: &str) -> ValidationResult<&str> {
    if platform.is_empty() {
        return Err(ValidationError::Missing("platform"));
    }
    if platform.len() > MAX_PLATFORM_LENGTH || !PLATFORM_REGEX.is_match(platform) {
        return Err(ValidationError::InvalidPlatform(platform.to_string()));
    }
    Ok(platform)
}

/// Validate a task or resource id
pub fn validate_item_id(id: &str) -> ValidationResult<&str> {
    if id.is_empty() {
        return Err(ValidationError::Missing("id"));
    }
    if id.len() > MAX_ITEM_ID_LENGTH {
        return Err(ValidationError::TooLong("id"));
    }
    if !ITEM_ID_REGEX.is_match(id) || id.split('/').any(|part| part == "..") {
        return Err(ValidationError::InvalidItemId(id.to_string()));
    }
    Ok(id)
}

/// Check the shape of a session token before looking it up
pub fn validate_session_token(token: &str) -> ValidationResult<&str> {
    if token.len() != SESSION_TOKEN_LENGTH || !SESSION_TOKEN_REGEX.is_match(token) {
        return Err(ValidationError::InvalidSessionToken(
            "malformed session token".to_string(),
        ));
    }
    Ok(token)
}

/// Validate a username or password field
pub fn validate_credential<'a>(field: &'static str, value: &'a str) -> ValidationResult<&'a str> {
    if value.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    if value.len() > MAX_CREDENTIAL_LENGTH {
        return Err(ValidationError::TooLong(field));
    }
    Ok(value)
}

/// Validate an optional email address; empty is accepted
pub fn validate_email(email: &str) -> ValidationResult<&str> {
    if email.is_empty() {
        return Ok(email);
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email"));
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_school() {
        assert!(validate_school("example").is_ok());
        assert!(validate_school("gihs").is_ok());
        assert!(validate_school("st-marys_2").is_ok());

        assert_eq!(validate_school(""), Err(ValidationError::Missing("school")));
        assert!(validate_school("GIHS").is_err());
        assert!(validate_school("../etc").is_err());
        assert!(validate_school(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_platform() {
        assert!(validate_platform("daymap").is_ok());
        assert!(validate_platform("gclass").is_ok());
        assert!(validate_platform("day map").is_err());
        assert!(validate_platform("").is_err());
    }

    #[test]
    fn test_validate_item_id() {
        assert!(validate_item_id("576252975").is_ok());
        assert!(validate_item_id("MTIzNDU2Nzg5MA==").is_ok());
        assert!(validate_item_id("123/456").is_ok());

        assert!(validate_item_id("").is_err());
        assert!(validate_item_id("a/../b").is_err());
        assert!(validate_item_id("<script>").is_err());
        assert!(validate_item_id(&"1".repeat(257)).is_err());
    }

    #[test]
    fn test_validate_session_token() {
        let token = crate::auth::generate_secure_token();
        assert!(validate_session_token(&token).is_ok());

        assert!(validate_session_token("short").is_err());
        assert!(validate_session_token(&"=".repeat(43)).is_err());
    }

    #[test]
    fn test_validate_credential_and_email() {
        assert!(validate_credential("username", "jsmith").is_ok());
        assert_eq!(
            validate_credential("password", ""),
            Err(ValidationError::Missing("password"))
        );
        assert!(validate_email("").is_ok());
        assert!(validate_email("student@example.edu.au").is_ok());
        assert!(validate_email("not-an-email").is_err());
    }
}

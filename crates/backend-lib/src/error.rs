// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::auth::{clear_cookie, SessionError};
use crate::platform::PlatformError;
use crate::validation::ValidationError;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported school: {0}")]
    UnsupportedSchool(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Authentication rate limit exceeded")]
    AuthRateLimited,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::UnsupportedSchool(_) => StatusCode::BAD_REQUEST,
            AppError::AuthFailed(_) => StatusCode::UNAUTHORIZED,
            AppError::AuthRateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Session(_) => StatusCode::SEE_OTHER,
            AppError::Platform(err) => match err {
                PlatformError::Unsupported(_) => StatusCode::NOT_FOUND,
                PlatformError::NotImplemented { .. } | PlatformError::NoProvider(_) => {
                    StatusCode::NOT_IMPLEMENTED
                },
                _ => StatusCode::BAD_GATEWAY,
            },
            AppError::Config(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "VAL_001",
            AppError::UnsupportedSchool(_) => "VAL_002",
            AppError::AuthFailed(_) => "AUTH_001",
            AppError::AuthRateLimited => "AUTH_003",
            AppError::Session(_) => "SESSION_001",
            AppError::Platform(PlatformError::Unsupported(_)) => "PLAT_001",
            AppError::Platform(PlatformError::NotImplemented { .. } | PlatformError::NoProvider(_)) => {
                "PLAT_002"
            },
            AppError::Platform(_) => "PLAT_003",
            AppError::Config(_) => "CFG_001",
            AppError::Io(_) => "IO_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::InvalidInput(_) => "Invalid input provided".to_string(),
            AppError::UnsupportedSchool(_) => "Unsupported school".to_string(),
            AppError::AuthFailed(_) => "Authentication failed".to_string(),
            AppError::AuthRateLimited => {
                "Too many authentication attempts, please try again later".to_string()
            },
            AppError::Session(_) => "Please log in again".to_string(),
            AppError::Platform(PlatformError::Unsupported(_)) => "Unsupported platform".to_string(),
            AppError::Platform(PlatformError::NotImplemented { .. } | PlatformError::NoProvider(_)) => {
                "This feature is not available for your school".to_string()
            },
            AppError::Platform(_) => "A school platform could not be reached".to_string(),
            AppError::Config(_) | AppError::Io(_) => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // an unknown or expired session sends the user back to the login page
        if let AppError::Session(_) = self {
            return ([(SET_COOKIE, clear_cookie())], Redirect::to("/login")).into_response();
        }

        let status = self.status_code();
        let error_code = self.error_code();

        // Use detailed messages in development, sanitized in production
        let message = if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, error = %self, "request failed");
        } else {
            tracing::debug!(code = error_code, error = %self, "request rejected");
        }

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

//! Errors raised while dispatching operations to platforms.
use std::fmt;

use thiserror::Error;

use super::Operation;

/// Failure of one or more platform calls
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("unsupported platform: {0}")]
    Unsupported(String),

    #[error("{platform} does not implement {operation}")]
    NotImplemented {
        platform: String,
        operation: Operation,
    },

    #[error("no {0} provider is set")]
    NoProvider(Operation),

    #[error("{platform}: cannot get {operation}: {source}")]
    Backend {
        platform: String,
        operation: Operation,
        #[source]
        source: anyhow::Error,
    },

    #[error("{platform}: {operation} task panicked")]
    Panicked {
        platform: String,
        operation: Operation,
    },

    #[error("{}", JoinedErrors(.0))]
    Aggregate(Vec<PlatformError>),
}

struct JoinedErrors<'a>(&'a [PlatformError]);

impl fmt::Display for JoinedErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl PlatformError {
    /// Wrap an error returned by a backend with its origin.
    ///
    /// Errors that are already a `PlatformError` (such as the default
    /// "not implemented" ones) are passed through unchanged.
    pub fn backend(platform: &str, operation: Operation, source: anyhow::Error) -> Self {
        match source.downcast::<PlatformError>() {
            Ok(err) => err,
            Err(source) => PlatformError::Backend {
                platform: platform.to_string(),
                operation,
                source,
            },
        }
    }

    /// Join several errors into one. A single error is returned as is.
    pub fn join(mut errors: Vec<PlatformError>) -> Self {
        if errors.len() == 1 {
            return errors.remove(0);
        }
        PlatformError::Aggregate(errors)
    }

    /// Whether the error was caused by naming a platform that is not registered
    pub fn is_unsupported(&self) -> bool {
        matches!(self, PlatformError::Unsupported(_))
    }
}

//! Unified error types for the preview core
//!
//! `Error` is what fallible internals return. A [`PreviewError`] travels
//! inside it untouched until the loader boundary unwraps it; everything
//! else is classified there as unexpected.

use crate::core::PreviewError;
use crate::store::StoreError;

/// Unified error type for preview operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O errors (config file, decompression, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Already classified domain failure
    #[error(transparent)]
    Preview(#[from] PreviewError),

    /// Unclassified object-store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Transport failure talking to a backend service
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend service answered with an error
    #[error("Service error: {0}")]
    Service(String),

    /// Response or payload could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Browsing-session mutation failed
    #[error("Session error: {name}: {message}")]
    Session { name: String, message: String },

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a Service error
    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }

    /// Create a Parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a Session error
    pub fn session(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Session {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a Config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an Internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The classified failure, if this is one
    pub fn as_preview(&self) -> Option<&PreviewError> {
        match self {
            Self::Preview(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

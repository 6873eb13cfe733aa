//! Common error types for Cirrus.

use thiserror::Error;

/// Top-level error type for Cirrus operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input, rejected before any external call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists. Retrying can never succeed.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A document-store or byte-storage operation failed.
    #[error("External system error: {0}")]
    ExternalSystem(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error may succeed on a later attempt.
    ///
    /// Only external-system and I/O failures are transient; validation and
    /// configuration errors are immediately fatal.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::ExternalSystem(_) | Error::Io(_))
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

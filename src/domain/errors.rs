//! Domain error types
//!
//! This module defines the error hierarchy for the samples. All errors are
//! domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main error type
///
/// This is the primary error type used throughout the crate.
/// It wraps store errors and provides context for error handling.
#[derive(Debug, Error)]
pub enum SamplesError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Document store errors
    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    /// Validation errors raised before a request leaves the process
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl SamplesError {
    /// Returns the store error, if this is one
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            SamplesError::Store(e) => Some(e),
            _ => None,
        }
    }

    /// Whether this error is a connection failure (fatal to the process)
    pub fn is_connection_error(&self) -> bool {
        matches!(self, SamplesError::Store(StoreError::ConnectionFailed(_)))
    }

    /// Whether this error is a query failure
    pub fn is_query_error(&self) -> bool {
        matches!(self, SamplesError::Store(StoreError::QueryFailed(_)))
    }

    /// Whether this error is a duplicate-identifier conflict
    pub fn is_write_conflict(&self) -> bool {
        matches!(self, SamplesError::Store(StoreError::WriteConflict(_)))
    }

    /// Whether this error is a validation failure, local or remote
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            SamplesError::Validation(_) | SamplesError::Store(StoreError::Validation(_))
        )
    }
}

/// Document store errors
///
/// Errors that occur when talking to the document store, whichever backend
/// serves it. Callers match on these to decide how to report a failure;
/// none of them are retried automatically.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Endpoint unreachable, credentials rejected, or connection closed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Malformed query text or missing collection
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A resource with the same identifier already exists (409)
    #[error("Write conflict: {0}")]
    WriteConflict(String),

    /// Required fields absent or request rejected as invalid (400)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Request rate too large (429)
    #[error("Request rate too large (429), retry after: {0}")]
    Throttled(String),

    /// Stored procedure or trigger failed or cannot run
    #[error("Script failed: {0}")]
    ScriptFailed(String),

    /// Any other non-success status returned by the service
    #[error("Service error: {status} - {message}")]
    Service { status: u16, message: String },

    /// The service answered with something we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for SamplesError {
    fn from(err: std::io::Error) -> Self {
        SamplesError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for SamplesError {
    fn from(err: serde_json::Error) -> Self {
        SamplesError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for SamplesError {
    fn from(err: toml::de::Error) -> Self {
        SamplesError::Configuration(format!("TOML parse error: {err}"))
    }
}

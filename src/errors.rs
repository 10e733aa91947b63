//! Error handling module
//!
//! Structured error types for trust map consolidation. Identity validation is
//! the single point of rejection; everything downstream assumes valid input.

use thiserror::Error;

/// Main error type for trust map operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrustMapError {
    /// Input validation error (malformed SID, empty domain name)
    #[error("Invalid input: {0}")]
    ValidationError(String),

    /// A partial identity (SID only) that matches no known domain
    #[error("Unresolved domain identity: {0}")]
    UnresolvedIdentity(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Parse error
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// I/O error while reading input
    #[error("I/O error: {0}")]
    IoError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for TrustMapError {
    fn from(err: std::io::Error) -> Self {
        TrustMapError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for TrustMapError {
    fn from(err: serde_json::Error) -> Self {
        TrustMapError::ParseError(format!("JSON parse error: {}", err))
    }
}

/// Result type alias for trust map operations
pub type Result<T> = std::result::Result<T, TrustMapError>;

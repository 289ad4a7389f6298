//! Error types for the Lyceum learning management system
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation at the
//! binary edge.

use thiserror::Error;

/// Main error type for Lyceum operations
#[derive(Error, Debug)]
pub enum LyceumError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Schema migration failed
    #[error("Migration error: {0}")]
    Migration(String),

    /// Invalid identifier format
    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] uuid::Error),

    /// Entity not found (kind, id)
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// Caller is authenticated but lacks the required role or relationship
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Missing, malformed, expired or revoked credentials
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Input failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation not allowed in the current state (e.g. enrolling in a draft)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Resource already exists
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Lyceum operations
pub type Result<T> = std::result::Result<T, LyceumError>;

impl LyceumError {
    /// Shorthand for a not-found error on a displayable id
    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        LyceumError::NotFound(kind, id.to_string())
    }

    /// Shorthand for a permission error
    pub fn denied(reason: impl Into<String>) -> Self {
        LyceumError::PermissionDenied(reason.into())
    }
}

/// Convert libsql errors, keeping the unique-constraint case distinguishable
impl From<libsql::Error> for LyceumError {
    fn from(err: libsql::Error) -> Self {
        let msg = err.to_string();
        if msg.contains("UNIQUE constraint failed") {
            LyceumError::AlreadyExists(msg)
        } else {
            LyceumError::Database(msg)
        }
    }
}

/// Convert anyhow::Error to LyceumError
impl From<anyhow::Error> for LyceumError {
    fn from(err: anyhow::Error) -> Self {
        LyceumError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LyceumError::not_found("Course", "abc");
        assert_eq!(err.to_string(), "Course not found: abc");

        let err = LyceumError::denied("not the course instructor");
        assert_eq!(
            err.to_string(),
            "Permission denied: not the course instructor"
        );
    }

    #[test]
    fn test_error_conversion() {
        let uuid_err = uuid::Uuid::parse_str("invalid");
        assert!(uuid_err.is_err());

        let lyceum_err: LyceumError = uuid_err.unwrap_err().into();
        assert!(matches!(lyceum_err, LyceumError::InvalidId(_)));
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: LyceumError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, LyceumError::Other(ref m) if m == "boom"));
    }
}

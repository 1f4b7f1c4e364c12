//! # Domain Errors
//!
//! Error types for the Shared State Store.

use thiserror::Error;

/// Errors raised by a key-value backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Backend unreachable or failed.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Operation applied to a key holding another kind of value.
    #[error("Wrong value type at key {0}")]
    WrongType(String),
}

/// State store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Shutdown has begun; writes are refused.
    #[error("State store is closed")]
    Closed,

    /// Stored value failed its integrity check.
    #[error("Integrity violation at key {key}")]
    IntegrityViolation {
        /// Caller-visible key (namespace stripped).
        key: String,
    },

    /// Authenticated payload could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Encryption failed before the value left the process.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Underlying backend failure.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_converts() {
        let err: StoreError = BackendError::Unavailable("timeout".into()).into();
        assert_eq!(err.to_string(), "Backend unavailable: timeout");
    }

    #[test]
    fn test_integrity_violation_names_key() {
        let err = StoreError::IntegrityViolation {
            key: "validators:abc".into(),
        };
        assert!(err.to_string().contains("validators:abc"));
    }
}

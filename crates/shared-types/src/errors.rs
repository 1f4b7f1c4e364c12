//! # Error Types
//!
//! Errors shared across subsystems.

use thiserror::Error;

/// Errors parsing validator identities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Input was not valid hex.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Decoded key had the wrong length.
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },
}

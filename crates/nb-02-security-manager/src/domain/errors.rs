//! # Error Types

use shared_crypto::CryptoError;
use shared_types::Timestamp;
use thiserror::Error;

/// Secure token validation failures. Each cause has its own kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Not `hex(payload).hex(tag)` or payload not a token.
    #[error("Malformed token")]
    Malformed,

    /// Tag does not match the payload.
    #[error("Token signature mismatch")]
    Tampered,

    /// `now > expiry`.
    #[error("Token expired at {expiry}")]
    Expired {
        /// Expiry time.
        expiry: Timestamp,
    },

    /// Valid token issued for another purpose.
    #[error("Token purpose mismatch: expected {expected}, got {actual}")]
    PurposeMismatch {
        /// Purpose the caller asked for.
        expected: String,
        /// Purpose in the token.
        actual: String,
    },
}

/// Security manager errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    /// Token validation failed.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Ciphertext sealed under a key generation that was rotated out.
    #[error("Stale key generation {generation} (current {current})")]
    StaleKey {
        /// Generation in the ciphertext.
        generation: u64,
        /// Current generation.
        current: u64,
    },

    /// Ciphertext too short to carry a generation header.
    #[error("Malformed ciphertext")]
    MalformedCiphertext,

    /// Underlying crypto failure.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Threat details could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

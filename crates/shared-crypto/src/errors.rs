//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed (wrong key, wrong associated data, or tampered ciphertext)
    #[error("Decryption failed: authentication tag mismatch")]
    DecryptionFailed,

    /// Sealed payload too short to contain a nonce and tag
    #[error("Malformed ciphertext: {len} bytes")]
    MalformedCiphertext {
        /// Length of the rejected payload
        len: usize,
    },

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// HMAC tag mismatch
    #[error("HMAC tag mismatch")]
    MacMismatch,
}

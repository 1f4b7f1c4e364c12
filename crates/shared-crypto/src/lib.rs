//! # Shared Crypto - Bridge Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `symmetric` | XChaCha20-Poly1305 | State-store values, sensitive data |
//! | `signatures` | Ed25519 | Validator signatures over bridge instructions |
//! | `mac` | HMAC-SHA256 | Secure token integrity tags |
//! | `hashing` | SHA-256 | Instruction digests |
//!
//! ## Security Properties
//!
//! - **XChaCha20**: 192-bit nonce, constant-time, fails closed on tamper
//! - **Ed25519**: Deterministic nonces, strict verification
//! - **HMAC-SHA256**: Constant-time tag comparison

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod mac;
pub mod signatures;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{sha256, Hash};
pub use mac::{hmac_sha256, verify_hmac_sha256};
pub use signatures::{verify_signature, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use symmetric::{open, seal, Nonce, SecretKey, NONCE_LEN, TAG_LEN};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

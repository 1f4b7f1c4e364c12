//! # Core Domain Entities
//!
//! Identity and signature types shared by every bridge subsystem.
//!
//! ## Clusters
//!
//! - **Identity**: `ValidatorId`, `PublicKey`
//! - **Signatures**: `Signature`, `ValidatorSignature`
//! - **Time**: `Timestamp`
//! - **Classification**: `Severity`

use crate::errors::IdentityError;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// Identity of a bridge validator.
///
/// A validator is identified by its Ed25519 public key, so the id doubles as
/// the key the settlement program checks signatures against.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct ValidatorId(pub PublicKey);

impl ValidatorId {
    /// Wrap raw public key bytes.
    pub fn from_public_key(key: PublicKey) -> Self {
        Self(key)
    }

    /// The validator's public key bytes.
    pub fn as_bytes(&self) -> &PublicKey {
        &self.0
    }

    /// Full lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, IdentityError> {
        let bytes = hex::decode(s).map_err(|e| IdentityError::InvalidHex(e.to_string()))?;
        let key: PublicKey = bytes
            .as_slice()
            .try_into()
            .map_err(|_| IdentityError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(key))
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "val:{}", hex::encode(&self.0[..6]))
    }
}

impl fmt::Debug for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorId({self})")
    }
}

// =============================================================================
// CLUSTER B: SIGNATURES
// =============================================================================

/// One entry of a threshold signature set: `{validatorPublicKey, signatureBytes}`.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSignature {
    /// Public key of the signing validator.
    pub validator_public_key: PublicKey,
    /// Ed25519 signature over the instruction message.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl ValidatorSignature {
    /// Create a new signature entry.
    pub fn new(validator_public_key: PublicKey, signature: Signature) -> Self {
        Self {
            validator_public_key,
            signature,
        }
    }

    /// The signer's validator id.
    pub fn signer(&self) -> ValidatorId {
        ValidatorId(self.validator_public_key)
    }
}

// =============================================================================
// CLUSTER C: TIME
// =============================================================================

/// Unix timestamp in seconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Maximum reasonable timestamp (year 9999).
    pub const MAX_REASONABLE: u64 = 253_402_300_799;

    /// Create a timestamp, clamping to `MAX_REASONABLE`.
    pub fn new(secs: u64) -> Self {
        Self(secs.min(Self::MAX_REASONABLE))
    }

    /// Seconds since the Unix epoch.
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Add seconds, saturating at `MAX_REASONABLE`.
    pub fn add_secs(&self, secs: u64) -> Self {
        Self::new(self.0.saturating_add(secs))
    }

    /// Seconds elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn secs_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// CLUSTER D: CLASSIFICATION
// =============================================================================

/// Severity shared by network alerts and security threats.
///
/// Ordering follows escalation: `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational.
    #[default]
    Low,
    /// Needs attention.
    Medium,
    /// Likely attack or outage.
    High,
    /// Immediate action required.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

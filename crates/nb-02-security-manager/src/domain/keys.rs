//! # Key Ring
//!
//! Two rotating keys: `primary` seals sensitive data, `standby` tags tokens.
//! Both are replaced on every rotation and the generation counter advances,
//! so data and tokens from an older generation stop validating.

use super::errors::SecurityError;
use shared_crypto::{open, seal, SecretKey};
use shared_types::Timestamp;

/// Length of the generation header on sealed data.
pub const GENERATION_LEN: usize = 8;

/// Current encryption and token keys.
#[derive(Debug)]
pub struct KeyRing {
    generation: u64,
    primary: SecretKey,
    standby: SecretKey,
    rotated_at: Timestamp,
}

impl KeyRing {
    /// Fresh random keys at generation 1.
    pub fn generate(now: Timestamp) -> Self {
        Self {
            generation: 1,
            primary: SecretKey::generate(),
            standby: SecretKey::generate(),
            rotated_at: now,
        }
    }

    /// Deterministic keys for tests.
    pub fn from_keys(primary: SecretKey, standby: SecretKey, now: Timestamp) -> Self {
        Self {
            generation: 1,
            primary,
            standby,
            rotated_at: now,
        }
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Last rotation time.
    pub fn rotated_at(&self) -> Timestamp {
        self.rotated_at
    }

    /// Token MAC key.
    pub fn token_key(&self) -> &SecretKey {
        &self.standby
    }

    /// Replace both keys.
    pub fn rotate(&mut self, now: Timestamp) {
        self.generation = self.generation.saturating_add(1);
        self.primary = SecretKey::generate();
        self.standby = SecretKey::generate();
        self.rotated_at = now;
    }

    /// Whether `period_secs` elapsed since the last rotation.
    pub fn rotation_due(&self, now: Timestamp, period_secs: u64) -> bool {
        now.secs_since(self.rotated_at) >= period_secs
    }

    /// `generation (u64 LE) ‖ seal(primary, plaintext, aad = header)`.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, SecurityError> {
        let header = self.generation.to_le_bytes();
        let sealed = seal(&self.primary, plaintext, &header)?;
        let mut out = Vec::with_capacity(GENERATION_LEN + sealed.len());
        out.extend_from_slice(&header);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Reverse of `seal`. An older generation fails with `StaleKey`.
    pub fn open(&self, data: &[u8]) -> Result<Vec<u8>, SecurityError> {
        if data.len() < GENERATION_LEN {
            return Err(SecurityError::MalformedCiphertext);
        }
        let (header, sealed) = data.split_at(GENERATION_LEN);
        let mut generation = [0u8; GENERATION_LEN];
        generation.copy_from_slice(header);
        let generation = u64::from_le_bytes(generation);
        if generation != self.generation {
            return Err(SecurityError::StaleKey {
                generation,
                current: self.generation,
            });
        }
        Ok(open(&self.primary, sealed, header)?)
    }
}

//! # Threshold Signature Sets
//!
//! Counts valid, distinct validator signatures over a message.

use crate::domain::ProgramError;
use shared_crypto::verify_signature;
use shared_types::{PublicKey, ValidatorSignature};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Verify a signature set against the current validator set.
///
/// Rules, checked in order:
/// 1. fewer entries than `threshold` fails fast with `InsufficientSignatures`
/// 2. any signer outside `validators` fails with `Unauthorized`
/// 3. failed verifications and repeated signers are skipped
/// 4. fewer than `threshold` counted fails with `InsufficientSignatures`
///
/// Returns the counted signers in submission order.
pub fn verify_signature_set(
    message: &[u8],
    signatures: &[ValidatorSignature],
    validators: &BTreeSet<PublicKey>,
    threshold: u8,
) -> Result<Vec<PublicKey>, ProgramError> {
    if signatures.len() < usize::from(threshold) {
        return Err(ProgramError::InsufficientSignatures {
            valid: 0,
            required: threshold,
        });
    }

    if signatures
        .iter()
        .any(|s| !validators.contains(&s.validator_public_key))
    {
        return Err(ProgramError::Unauthorized);
    }

    let mut seen = HashSet::with_capacity(signatures.len());
    let mut counted = Vec::with_capacity(signatures.len());
    for entry in signatures {
        if !seen.insert(entry.validator_public_key) {
            debug!(
                "[nb-03] Duplicate signer {} ignored",
                entry.signer()
            );
            continue;
        }
        match verify_signature(&entry.validator_public_key, message, &entry.signature) {
            Ok(()) => counted.push(entry.validator_public_key),
            Err(e) => debug!("[nb-03] Signature from {} not counted: {}", entry.signer(), e),
        }
    }

    if counted.len() < usize::from(threshold) {
        return Err(ProgramError::InsufficientSignatures {
            valid: counted.len(),
            required: threshold,
        });
    }
    Ok(counted)
}

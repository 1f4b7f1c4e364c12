//! # Canonical Instruction Messages
//!
//! Byte strings validators sign. Layout is `DOMAIN ‖ fields` with
//! little-endian integers. Every instruction kind has its own domain tag so
//! a signature over one kind never verifies as another.
//!
//! Admin messages bind the program nonce at signing time. Once the
//! instruction finalizes the nonce moves on and the same signature set no
//! longer verifies.

use crate::domain::{ConfigUpdate, DepositInstruction, WithdrawInstruction};
use shared_crypto::sha256;
use shared_types::Hash;

/// Deposit domain tag.
pub const DEPOSIT_DOMAIN: &[u8] = b"NOCKBRIDGE_DEPOSIT_V1";
/// Withdrawal domain tag.
pub const WITHDRAW_DOMAIN: &[u8] = b"NOCKBRIDGE_WITHDRAW_V1";
/// Emergency pause domain tag.
pub const PAUSE_DOMAIN: &[u8] = b"NOCKBRIDGE_PAUSE_V1";
/// Unpause domain tag.
pub const UNPAUSE_DOMAIN: &[u8] = b"NOCKBRIDGE_UNPAUSE_V1";
/// Unpause-before-delay domain tag.
pub const UNPAUSE_OVERRIDE_DOMAIN: &[u8] = b"NOCKBRIDGE_UNPAUSE_OVERRIDE_V1";
/// Config update domain tag.
pub const CONFIG_DOMAIN: &[u8] = b"NOCKBRIDGE_CONFIG_V1";

/// Message signed for `deposit_nock`.
pub fn deposit_message(ix: &DepositInstruction) -> Vec<u8> {
    let mut msg = Vec::with_capacity(DEPOSIT_DOMAIN.len() + 8 + 32 + 32 + 4 + 8);
    msg.extend_from_slice(DEPOSIT_DOMAIN);
    msg.extend_from_slice(&ix.amount.to_le_bytes());
    msg.extend_from_slice(&ix.recipient);
    msg.extend_from_slice(&ix.proof.event.tx_hash);
    msg.extend_from_slice(&ix.proof.event.log_index.to_le_bytes());
    msg.extend_from_slice(&ix.proof.source_height.to_le_bytes());
    msg
}

/// Message signed for `withdraw_nock`.
pub fn withdraw_message(ix: &WithdrawInstruction) -> Vec<u8> {
    let mut msg = Vec::with_capacity(WITHDRAW_DOMAIN.len() + 32 + 32 + 8 + 32);
    msg.extend_from_slice(WITHDRAW_DOMAIN);
    msg.extend_from_slice(&ix.request_id);
    msg.extend_from_slice(&ix.owner);
    msg.extend_from_slice(&ix.amount.to_le_bytes());
    msg.extend_from_slice(&ix.destination);
    msg
}

/// Message signed for `emergency_pause`.
pub fn pause_message(nonce: u64) -> Vec<u8> {
    admin_message(PAUSE_DOMAIN, nonce)
}

/// Message signed for `unpause_bridge`.
pub fn unpause_message(nonce: u64) -> Vec<u8> {
    admin_message(UNPAUSE_DOMAIN, nonce)
}

/// Message signed for `unpause_bridge_override`.
pub fn unpause_override_message(nonce: u64) -> Vec<u8> {
    admin_message(UNPAUSE_OVERRIDE_DOMAIN, nonce)
}

/// Message signed for `update_bridge_config`.
///
/// Each optional field is prefixed by a presence byte. Validators are
/// sorted first, so signers agree regardless of list order.
pub fn config_update_message(update: &ConfigUpdate, nonce: u64) -> Vec<u8> {
    let mut msg = admin_message(CONFIG_DOMAIN, nonce);

    match update.fee_rate_bps {
        Some(fee) => {
            msg.push(1);
            msg.extend_from_slice(&fee.to_le_bytes());
        }
        None => msg.push(0),
    }
    match update.daily_limit {
        Some(limit) => {
            msg.push(1);
            msg.extend_from_slice(&limit.to_le_bytes());
        }
        None => msg.push(0),
    }
    match &update.validators {
        Some(validators) => {
            let mut sorted = validators.clone();
            sorted.sort_unstable();
            msg.push(1);
            msg.extend_from_slice(&(sorted.len() as u32).to_le_bytes());
            for key in &sorted {
                msg.extend_from_slice(key);
            }
        }
        None => msg.push(0),
    }
    match update.threshold {
        Some(t) => {
            msg.push(1);
            msg.push(t);
        }
        None => msg.push(0),
    }
    msg
}

/// SHA-256 of a canonical message. Used as the consensus round payload id.
pub fn instruction_digest(message: &[u8]) -> Hash {
    sha256(message)
}

fn admin_message(domain: &[u8], nonce: u64) -> Vec<u8> {
    let mut msg = Vec::with_capacity(domain.len() + 8);
    msg.extend_from_slice(domain);
    msg.extend_from_slice(&nonce.to_le_bytes());
    msg
}

//! # Algorithms Module
//!
//! Canonical messages, signature-set verification and fee arithmetic.

pub mod fees;
pub mod messages;
pub mod signatures;

pub use fees::compute_fee;
pub use messages::{
    config_update_message, deposit_message, instruction_digest, pause_message,
    unpause_message, unpause_override_message, withdraw_message,
};
pub use signatures::verify_signature_set;

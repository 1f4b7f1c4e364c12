//! # Store Records
//!
//! Records the store itself defines. Other families carry caller-defined
//! serde types.

use serde::{Deserialize, Serialize};
use shared_types::{Timestamp, ValidatorId};

/// Validator registry entry, refreshed on every heartbeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    /// Validator identity (public key).
    pub validator_id: ValidatorId,
    /// Peer wire address.
    pub address: String,
    /// Last heartbeat time.
    pub last_heartbeat: Timestamp,
    /// Reputation as seen by the writer (0-100).
    pub reputation: u8,
}

/// Emergency-mode flag contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyFlag {
    /// Why emergency mode was entered.
    pub reason: String,
    /// Validator that raised the flag.
    pub raised_by: ValidatorId,
    /// When it was raised.
    pub raised_at: Timestamp,
}

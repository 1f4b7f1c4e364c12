//! # Value Objects
//!
//! Identifiers, limits and policies of the settlement program.

use serde::{Deserialize, Serialize};
use shared_types::Hash;
use std::fmt;

/// Settlement-chain account (32 bytes).
pub type AccountId = [u8; 32];

/// Nockchain address (32 bytes).
pub type NockAddress = [u8; 32];

/// Basis-point denominator for fee rates.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Decimals of the wrapped token.
pub const WRAPPED_DECIMALS: u8 = 8;

/// Base units per whole NOCK.
pub const UNITS_PER_NOCK: u64 = 100_000_000;

/// Length of the rolling volume window.
pub const DAY_SECS: u64 = 86_400;

/// Unique id of a source-chain lock event: transaction hash plus log index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceEventId {
    /// Source-chain transaction hash.
    pub tx_hash: Hash,
    /// Index of the lock event within the transaction.
    pub log_index: u32,
}

impl fmt::Display for SourceEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", hex::encode(self.tx_hash), self.log_index)
    }
}

/// Key under which a finalized instruction is remembered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplayKey {
    /// A source-chain lock event.
    Deposit(SourceEventId),
    /// A withdrawal request id.
    Withdrawal(Hash),
}

impl fmt::Display for ReplayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayKey::Deposit(id) => write!(f, "deposit:{id}"),
            ReplayKey::Withdrawal(id) => write!(f, "withdrawal:{}", hex::encode(id)),
        }
    }
}

/// Whether a threshold set may unpause before the emergency delay elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnpausePolicy {
    /// Unpause only after `pause_timestamp + emergency_delay`.
    #[default]
    EnforceDelay,
    /// Additionally accept `unpause_bridge_override`, signed over a distinct
    /// override message, at any time.
    AllowThresholdOverride,
}

/// Structural limits checked at initialization and config update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolLimits {
    /// Smallest validator set.
    pub min_validators: usize,
    /// Largest validator set.
    pub max_validators: usize,
    /// Smallest emergency delay.
    pub min_emergency_delay_secs: u64,
    /// Rolling window length.
    pub window_secs: u64,
}

impl Default for ProtocolLimits {
    fn default() -> Self {
        Self {
            min_validators: 1,
            max_validators: 15,
            min_emergency_delay_secs: 3_600,
            window_secs: DAY_SECS,
        }
    }
}

/// Program-wide policy fixed at deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramPolicy {
    /// Structural limits.
    pub limits: ProtocolLimits,
    /// Unpause delay policy.
    pub unpause: UnpausePolicy,
    /// Account credited with bridge fees.
    pub fee_collector: AccountId,
}

impl Default for ProgramPolicy {
    fn default() -> Self {
        Self {
            limits: ProtocolLimits::default(),
            unpause: UnpausePolicy::default(),
            fee_collector: [0xFE; 32],
        }
    }
}

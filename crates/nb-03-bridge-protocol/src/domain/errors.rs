//! # Domain Errors
//!
//! The closed error taxonomy reported by the settlement program. Callers get
//! a named kind for every failure, never a generic "transaction failed".

use thiserror::Error;

/// Settlement program errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    /// Instruction rejected because the bridge is paused.
    #[error("Bridge is paused")]
    BridgePaused,

    /// Zero amount.
    #[error("Invalid amount: must be greater than zero")]
    InvalidAmount,

    /// Fewer valid, distinct validator signatures than the threshold.
    #[error("Insufficient signatures: {valid}/{required}")]
    InsufficientSignatures {
        /// Valid distinct signatures counted.
        valid: usize,
        /// Current threshold.
        required: u8,
    },

    /// Window volume plus this amount would exceed the daily limit.
    #[error("Daily limit exceeded: window volume {window_volume} + {amount} > {limit}")]
    DailyLimitExceeded {
        /// Volume already in the rolling window.
        window_volume: u64,
        /// Rejected amount.
        amount: u64,
        /// Configured daily limit.
        limit: u64,
    },

    /// A signature came from a key outside the current validator set.
    #[error("Unauthorized signer")]
    Unauthorized,

    /// Validator set size outside the allowed range.
    #[error("Invalid validator count: {count} (allowed {min}..={max})")]
    InvalidValidatorCount {
        /// Supplied count.
        count: usize,
        /// Minimum allowed.
        min: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// Same key listed twice in a validator set.
    #[error("Duplicate validator in set")]
    DuplicateValidator,

    /// Threshold outside `[ceil(n/2), n]` or zero.
    #[error("Invalid threshold {threshold} for {validators} validators")]
    InvalidThreshold {
        /// Requested threshold.
        threshold: u8,
        /// Validator set size.
        validators: usize,
    },

    /// Fee rate above 10 000 basis points.
    #[error("Invalid fee rate: {0} bps")]
    InvalidFeeRate(u16),

    /// Daily limit of zero.
    #[error("Invalid daily limit: must be greater than zero")]
    InvalidDailyLimit,

    /// Emergency delay below the configured minimum.
    #[error("Invalid emergency delay: {got}s (minimum {min}s)")]
    InvalidEmergencyDelay {
        /// Requested delay.
        got: u64,
        /// Minimum allowed.
        min: u64,
    },

    /// `initialize_bridge` called twice.
    #[error("Bridge already initialized")]
    AlreadyInitialized,

    /// Instruction before `initialize_bridge`.
    #[error("Bridge not initialized")]
    NotInitialized,

    /// Pause while already paused.
    #[error("Bridge already paused")]
    AlreadyPaused,

    /// Unpause while not paused.
    #[error("Bridge not paused")]
    NotPaused,

    /// Unpause attempted before `pause_timestamp + emergency_delay`.
    #[error("Emergency delay not met: {remaining_secs}s remaining")]
    EmergencyDelayNotMet {
        /// Seconds until unpause is allowed.
        remaining_secs: u64,
    },

    /// Delay override requested but the program does not allow it.
    #[error("Emergency delay override is disabled")]
    DelayOverrideDisabled,

    /// Source-chain event or withdrawal request already finalized.
    #[error("Source event already consumed: {0}")]
    SourceEventConsumed(String),

    /// Burn exceeds the owner's wrapped balance.
    #[error("Insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance {
        /// Amount to burn.
        needed: u64,
        /// Owner's balance.
        available: u64,
    },

    /// Checked arithmetic failed.
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

impl ProgramError {
    /// Whether a retry with the same inputs could succeed later.
    ///
    /// Pause state and the rolling window change over time; every other
    /// kind is a property of the instruction or its signatures.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProgramError::BridgePaused
                | ProgramError::DailyLimitExceeded { .. }
                | ProgramError::EmergencyDelayNotMet { .. }
        )
    }
}

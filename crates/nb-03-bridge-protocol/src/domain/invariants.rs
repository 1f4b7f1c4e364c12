//! # Invariants
//!
//! Structural checks on bridge parameters. Each returns the specific
//! `ProgramError` kind so callers never see a generic rejection.

use super::entities::{BridgeState, ConfigUpdate, InitializeParams};
use super::errors::ProgramError;
use super::value_objects::{ProtocolLimits, BPS_DENOMINATOR};
use shared_types::PublicKey;
use std::collections::HashSet;

/// Validator set size within limits and free of duplicates.
pub fn invariant_validator_set(
    validators: &[PublicKey],
    limits: &ProtocolLimits,
) -> Result<(), ProgramError> {
    let count = validators.len();
    if count < limits.min_validators || count > limits.max_validators {
        return Err(ProgramError::InvalidValidatorCount {
            count,
            min: limits.min_validators,
            max: limits.max_validators,
        });
    }
    let mut seen = HashSet::with_capacity(count);
    if !validators.iter().all(|key| seen.insert(key)) {
        return Err(ProgramError::DuplicateValidator);
    }
    Ok(())
}

/// `max(1, ceil(n/2)) <= threshold <= n`.
pub fn invariant_threshold(threshold: u8, validators: usize) -> Result<(), ProgramError> {
    let majority = validators.div_ceil(2).max(1);
    let t = usize::from(threshold);
    if t < majority || t > validators {
        return Err(ProgramError::InvalidThreshold {
            threshold,
            validators,
        });
    }
    Ok(())
}

/// Fee rate at most 100 %.
pub fn invariant_fee_rate(fee_rate_bps: u16) -> Result<(), ProgramError> {
    if u64::from(fee_rate_bps) > BPS_DENOMINATOR {
        return Err(ProgramError::InvalidFeeRate(fee_rate_bps));
    }
    Ok(())
}

/// Non-zero daily limit.
pub fn invariant_daily_limit(daily_limit: u64) -> Result<(), ProgramError> {
    if daily_limit == 0 {
        return Err(ProgramError::InvalidDailyLimit);
    }
    Ok(())
}

/// Emergency delay at least the configured minimum.
pub fn invariant_emergency_delay(secs: u64, limits: &ProtocolLimits) -> Result<(), ProgramError> {
    if secs < limits.min_emergency_delay_secs {
        return Err(ProgramError::InvalidEmergencyDelay {
            got: secs,
            min: limits.min_emergency_delay_secs,
        });
    }
    Ok(())
}

/// All initialization checks.
pub fn check_initialize(
    params: &InitializeParams,
    limits: &ProtocolLimits,
) -> Result<(), ProgramError> {
    invariant_validator_set(&params.validators, limits)?;
    invariant_threshold(params.threshold, params.validators.len())?;
    invariant_fee_rate(params.fee_rate_bps)?;
    invariant_daily_limit(params.daily_limit)?;
    invariant_emergency_delay(params.emergency_delay_secs, limits)
}

/// Validate a config update against the state it would produce.
///
/// A new validator set is checked against the resulting threshold, which is
/// the updated one if given, otherwise the current one.
pub fn check_config_update(
    state: &BridgeState,
    update: &ConfigUpdate,
    limits: &ProtocolLimits,
) -> Result<(), ProgramError> {
    if let Some(fee) = update.fee_rate_bps {
        invariant_fee_rate(fee)?;
    }
    if let Some(limit) = update.daily_limit {
        invariant_daily_limit(limit)?;
    }
    let validator_count = match &update.validators {
        Some(validators) => {
            invariant_validator_set(validators, limits)?;
            validators.len()
        }
        None => state.validators.len(),
    };
    let threshold = update.threshold.unwrap_or(state.threshold);
    invariant_threshold(threshold, validator_count)
}

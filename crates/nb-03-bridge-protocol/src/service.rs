//! # Settlement Program Service
//!
//! The bridge state machine: Uninitialized, Active, Paused.
//!
//! ## Finalization Order
//!
//! Every instruction runs all fallible checks before touching state:
//!
//! 1. lifecycle (initialized, paused)
//! 2. instruction shape (amount)
//! 3. signature set over the canonical message
//! 4. replay (consumed source event or request id)
//! 5. rolling daily window
//! 6. fee and nonce arithmetic
//! 7. ledger batch (atomic)
//!
//! Only then are the infallible state updates applied, so a rejected
//! instruction never leaves a partial mutation behind.

use crate::algorithms::{
    compute_fee, config_update_message, deposit_message, pause_message, unpause_message,
    unpause_override_message, verify_signature_set, withdraw_message,
};
use crate::domain::{
    check_config_update, check_initialize, AdminReceipt, BridgeState, BridgeStateView,
    BridgeStats, ConfigUpdate, DepositInstruction, DepositReceipt, InitializeParams,
    ProgramError, ProgramEvent, ProgramPolicy, ReplayKey, UnpausePolicy, WithdrawInstruction,
    WithdrawReceipt,
};
use crate::ports::{LedgerOp, TokenLedger};
use shared_types::{PublicKey, Timestamp, ValidatorSignature};
use std::sync::Arc;
use tracing::{info, warn};

/// The settlement program.
///
/// Methods take `now` explicitly; the adapter layer owns the clock.
pub struct BridgeProgram {
    policy: ProgramPolicy,
    state: Option<BridgeState>,
    ledger: Arc<dyn TokenLedger>,
    stats: BridgeStats,
    events: Vec<ProgramEvent>,
}

impl BridgeProgram {
    /// Uninitialized program over `ledger`.
    pub fn new(policy: ProgramPolicy, ledger: Arc<dyn TokenLedger>) -> Self {
        Self {
            policy,
            state: None,
            ledger,
            stats: BridgeStats::default(),
            events: Vec::new(),
        }
    }

    /// Program policy.
    pub fn policy(&self) -> &ProgramPolicy {
        &self.policy
    }

    /// Current state, if initialized.
    pub fn state(&self) -> Option<&BridgeState> {
        self.state.as_ref()
    }

    /// Snapshot at `now`.
    pub fn view(&self, now: Timestamp) -> Result<BridgeStateView, ProgramError> {
        self.state
            .as_ref()
            .map(|s| s.view(now))
            .ok_or(ProgramError::NotInitialized)
    }

    /// Running statistics.
    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    /// Emitted events, oldest first.
    pub fn events(&self) -> &[ProgramEvent] {
        &self.events
    }

    /// The wrapped-token ledger.
    pub fn ledger(&self) -> &Arc<dyn TokenLedger> {
        &self.ledger
    }

    /// Whether `key` was already finalized.
    pub fn is_consumed(&self, key: &ReplayKey) -> bool {
        self.state.as_ref().is_some_and(|s| s.is_consumed(key))
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Uninitialized to Active.
    pub fn initialize_bridge(&mut self, params: InitializeParams) -> Result<(), ProgramError> {
        if self.state.is_some() {
            return Err(ProgramError::AlreadyInitialized);
        }
        check_initialize(&params, &self.policy.limits)?;

        info!(
            "[nb-03] Bridge initialized: {}-of-{} validators, fee {} bps, daily limit {}",
            params.threshold,
            params.validators.len(),
            params.fee_rate_bps,
            params.daily_limit
        );
        self.state = Some(BridgeState::new(&params, self.policy.limits.window_secs));
        Ok(())
    }

    // =========================================================================
    // TRANSFERS
    // =========================================================================

    /// Credit wrapped tokens for a source-chain lock.
    pub fn deposit_nock(
        &mut self,
        ix: &DepositInstruction,
        signatures: &[ValidatorSignature],
        now: Timestamp,
    ) -> Result<DepositReceipt, ProgramError> {
        let collector = self.policy.fee_collector;
        let state = self.state.as_mut().ok_or(ProgramError::NotInitialized)?;

        if state.is_paused() {
            return Err(ProgramError::BridgePaused);
        }
        if ix.amount == 0 {
            return Err(ProgramError::InvalidAmount);
        }
        let signers = verify_signature_set(
            &deposit_message(ix),
            signatures,
            &state.validators,
            state.threshold,
        )?;
        let key = ix.replay_key();
        if state.is_consumed(&key) {
            return Err(ProgramError::SourceEventConsumed(key.to_string()));
        }
        state
            .window
            .ensure_capacity(now, ix.amount, state.daily_limit)?;
        let (fee, net) = compute_fee(ix.amount, state.fee_rate_bps)?;
        let nonce = state
            .nonce
            .checked_add(1)
            .ok_or(ProgramError::ArithmeticOverflow)?;
        let fees_collected = state
            .total_fees_collected
            .checked_add(fee)
            .ok_or(ProgramError::ArithmeticOverflow)?;

        self.ledger.apply(&credit_ops(ix.recipient, net, collector, fee))?;

        state.nonce = nonce;
        state.total_locked = state.total_locked.saturating_add(ix.amount);
        state.total_fees_collected = fees_collected;
        state.window.record(now, ix.amount);
        state.consumed.insert(key);
        let peak = state.window.peak();

        let receipt = DepositReceipt {
            nonce,
            amount: ix.amount,
            fee,
            net_amount: net,
            recipient: ix.recipient,
            source_event: ix.proof.event,
            timestamp: now,
        };
        self.stats.record_transfer(ix.amount, fee, true, peak);
        self.stats.record_signers(&signers);
        self.events.push(ProgramEvent::Deposit(receipt.clone()));

        info!(
            "[nb-03] Deposit finalized: {} ({} net, {} fee), nonce {}",
            ix.proof.event, net, fee, nonce
        );
        Ok(receipt)
    }

    /// Burn wrapped tokens and record the release on the source chain.
    pub fn withdraw_nock(
        &mut self,
        ix: &WithdrawInstruction,
        signatures: &[ValidatorSignature],
        now: Timestamp,
    ) -> Result<WithdrawReceipt, ProgramError> {
        let collector = self.policy.fee_collector;
        let state = self.state.as_mut().ok_or(ProgramError::NotInitialized)?;

        if state.is_paused() {
            return Err(ProgramError::BridgePaused);
        }
        if ix.amount == 0 {
            return Err(ProgramError::InvalidAmount);
        }
        let signers = verify_signature_set(
            &withdraw_message(ix),
            signatures,
            &state.validators,
            state.threshold,
        )?;
        let key = ix.replay_key();
        if state.is_consumed(&key) {
            return Err(ProgramError::SourceEventConsumed(key.to_string()));
        }
        state
            .window
            .ensure_capacity(now, ix.amount, state.daily_limit)?;
        let (fee, net) = compute_fee(ix.amount, state.fee_rate_bps)?;
        let nonce = state
            .nonce
            .checked_add(1)
            .ok_or(ProgramError::ArithmeticOverflow)?;
        let fees_collected = state
            .total_fees_collected
            .checked_add(fee)
            .ok_or(ProgramError::ArithmeticOverflow)?;

        let mut ops = vec![LedgerOp::Burn {
            account: ix.owner,
            amount: ix.amount,
        }];
        if fee > 0 {
            ops.push(LedgerOp::Mint {
                account: collector,
                amount: fee,
            });
        }
        self.ledger.apply(&ops)?;

        state.nonce = nonce;
        state.total_locked = state.total_locked.saturating_sub(net);
        state.total_fees_collected = fees_collected;
        state.window.record(now, ix.amount);
        state.consumed.insert(key);
        let peak = state.window.peak();

        let receipt = WithdrawReceipt {
            nonce,
            amount: ix.amount,
            fee,
            net_amount: net,
            destination: ix.destination,
            request_id: ix.request_id,
            timestamp: now,
        };
        self.stats.record_transfer(ix.amount, fee, false, peak);
        self.stats.record_signers(&signers);
        self.events.push(ProgramEvent::Withdraw(receipt.clone()));

        info!(
            "[nb-03] Withdrawal finalized: {} released to {}, nonce {}",
            net,
            hex::encode(&ix.destination[..8]),
            nonce
        );
        Ok(receipt)
    }

    // =========================================================================
    // ADMIN
    // =========================================================================

    /// Active to Paused.
    pub fn emergency_pause(
        &mut self,
        signatures: &[ValidatorSignature],
        now: Timestamp,
    ) -> Result<AdminReceipt, ProgramError> {
        let state = self.state.as_mut().ok_or(ProgramError::NotInitialized)?;
        if state.is_paused() {
            return Err(ProgramError::AlreadyPaused);
        }
        let signers = verify_signature_set(
            &pause_message(state.nonce),
            signatures,
            &state.validators,
            state.threshold,
        )?;
        let nonce = next_nonce(state)?;

        state.nonce = nonce;
        state.pause_timestamp = Some(now);

        warn!("[nb-03] EMERGENCY PAUSE at {} (nonce {})", now, nonce);
        let receipt = self.admin_receipt(nonce, now, signers);
        self.events.push(ProgramEvent::EmergencyPause(receipt.clone()));
        Ok(receipt)
    }

    /// Paused to Active once `pause_timestamp + emergency_delay` has passed.
    pub fn unpause_bridge(
        &mut self,
        signatures: &[ValidatorSignature],
        now: Timestamp,
    ) -> Result<AdminReceipt, ProgramError> {
        let state = self.state.as_mut().ok_or(ProgramError::NotInitialized)?;
        let paused_at = state.pause_timestamp.ok_or(ProgramError::NotPaused)?;

        let elapsed = now.secs_since(paused_at);
        if elapsed < state.emergency_delay_secs {
            return Err(ProgramError::EmergencyDelayNotMet {
                remaining_secs: state.emergency_delay_secs - elapsed,
            });
        }
        let signers = verify_signature_set(
            &unpause_message(state.nonce),
            signatures,
            &state.validators,
            state.threshold,
        )?;
        self.finish_unpause(signers, now, false)
    }

    /// Paused to Active at any time, over the distinct override message.
    ///
    /// Refused with `DelayOverrideDisabled` unless the policy allows it.
    pub fn unpause_bridge_override(
        &mut self,
        signatures: &[ValidatorSignature],
        now: Timestamp,
    ) -> Result<AdminReceipt, ProgramError> {
        if self.policy.unpause != UnpausePolicy::AllowThresholdOverride {
            return Err(ProgramError::DelayOverrideDisabled);
        }
        let state = self.state.as_mut().ok_or(ProgramError::NotInitialized)?;
        if !state.is_paused() {
            return Err(ProgramError::NotPaused);
        }
        let signers = verify_signature_set(
            &unpause_override_message(state.nonce),
            signatures,
            &state.validators,
            state.threshold,
        )?;
        self.finish_unpause(signers, now, true)
    }

    /// Apply a config change signed by the current validator set.
    pub fn update_bridge_config(
        &mut self,
        update: &ConfigUpdate,
        signatures: &[ValidatorSignature],
        now: Timestamp,
    ) -> Result<AdminReceipt, ProgramError> {
        let state = self.state.as_mut().ok_or(ProgramError::NotInitialized)?;
        let signers = verify_signature_set(
            &config_update_message(update, state.nonce),
            signatures,
            &state.validators,
            state.threshold,
        )?;
        check_config_update(state, update, &self.policy.limits)?;
        let nonce = next_nonce(state)?;

        state.nonce = nonce;
        if let Some(fee) = update.fee_rate_bps {
            state.fee_rate_bps = fee;
        }
        if let Some(limit) = update.daily_limit {
            state.daily_limit = limit;
        }
        if let Some(validators) = &update.validators {
            state.validators = validators.iter().copied().collect();
        }
        if let Some(threshold) = update.threshold {
            state.threshold = threshold;
        }

        info!(
            "[nb-03] Config updated (nonce {}): {}-of-{}, fee {} bps, daily limit {}",
            nonce,
            state.threshold,
            state.validators.len(),
            state.fee_rate_bps,
            state.daily_limit
        );
        let receipt = self.admin_receipt(nonce, now, signers);
        self.events.push(ProgramEvent::ConfigUpdate {
            receipt: receipt.clone(),
            update: update.clone(),
        });
        Ok(receipt)
    }

    fn finish_unpause(
        &mut self,
        signers: Vec<PublicKey>,
        now: Timestamp,
        overridden: bool,
    ) -> Result<AdminReceipt, ProgramError> {
        let state = self.state.as_mut().ok_or(ProgramError::NotInitialized)?;
        let nonce = next_nonce(state)?;
        state.nonce = nonce;
        state.pause_timestamp = None;

        info!(
            "[nb-03] Bridge unpaused at {} (nonce {}, override: {})",
            now, nonce, overridden
        );
        let receipt = self.admin_receipt(nonce, now, signers);
        self.events.push(ProgramEvent::Unpause {
            receipt: receipt.clone(),
            overridden,
        });
        Ok(receipt)
    }

    fn admin_receipt(
        &mut self,
        nonce: u64,
        now: Timestamp,
        signers: Vec<PublicKey>,
    ) -> AdminReceipt {
        self.stats.record_signers(&signers);
        AdminReceipt {
            nonce,
            timestamp: now,
            signers,
        }
    }
}

fn next_nonce(state: &BridgeState) -> Result<u64, ProgramError> {
    state
        .nonce
        .checked_add(1)
        .ok_or(ProgramError::ArithmeticOverflow)
}

fn credit_ops(
    recipient: [u8; 32],
    net: u64,
    collector: [u8; 32],
    fee: u64,
) -> Vec<LedgerOp> {
    [(recipient, net), (collector, fee)]
        .into_iter()
        .filter(|(_, amount)| *amount > 0)
        .map(|(account, amount)| LedgerOp::Mint { account, amount })
        .collect()
}

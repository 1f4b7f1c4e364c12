//! # Domain Entities
//!
//! Bridge state, instructions, receipts, events and statistics.

use super::value_objects::{AccountId, NockAddress, ReplayKey, SourceEventId};
use super::window::RollingVolumeWindow;
use serde::{Deserialize, Serialize};
use shared_types::{Hash, PublicKey, Timestamp, ValidatorId};
use std::collections::{BTreeSet, HashMap, HashSet};

// =============================================================================
// INSTRUCTIONS
// =============================================================================

/// Parameters of `initialize_bridge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeParams {
    /// Admin key recorded for audit.
    pub authority: PublicKey,
    /// Validator public keys. Order is irrelevant; duplicates are rejected.
    pub validators: Vec<PublicKey>,
    /// Signatures required per instruction.
    pub threshold: u8,
    /// Fee in basis points.
    pub fee_rate_bps: u16,
    /// Rolling 24 h volume cap, in base units.
    pub daily_limit: u64,
    /// Minimum time between pause and unpause.
    pub emergency_delay_secs: u64,
}

/// Proof that NOCK was locked on the source chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceProof {
    /// The lock event.
    pub event: SourceEventId,
    /// Source block containing the event.
    pub source_height: u64,
}

/// `deposit_nock`: credit wrapped tokens for a source-chain lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepositInstruction {
    /// Locked amount in base units.
    pub amount: u64,
    /// Settlement-chain account to credit.
    pub recipient: AccountId,
    /// Source-chain lock proof.
    pub proof: SourceProof,
}

impl DepositInstruction {
    /// Replay key of this deposit.
    pub fn replay_key(&self) -> ReplayKey {
        ReplayKey::Deposit(self.proof.event)
    }
}

/// `withdraw_nock`: burn wrapped tokens and release NOCK on the source chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WithdrawInstruction {
    /// Unique request id chosen by the requester.
    pub request_id: Hash,
    /// Settlement-chain account whose wrapped tokens are burned.
    pub owner: AccountId,
    /// Amount burned, in base units.
    pub amount: u64,
    /// Nockchain destination of the released funds.
    pub destination: NockAddress,
}

impl WithdrawInstruction {
    /// Replay key of this withdrawal.
    pub fn replay_key(&self) -> ReplayKey {
        ReplayKey::Withdrawal(self.request_id)
    }
}

/// `update_bridge_config`: unspecified fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    /// New fee rate.
    pub fee_rate_bps: Option<u16>,
    /// New daily limit.
    pub daily_limit: Option<u64>,
    /// New validator set.
    pub validators: Option<Vec<PublicKey>>,
    /// New threshold.
    pub threshold: Option<u8>,
}

impl ConfigUpdate {
    /// Whether every field is unspecified.
    pub fn is_empty(&self) -> bool {
        self.fee_rate_bps.is_none()
            && self.daily_limit.is_none()
            && self.validators.is_none()
            && self.threshold.is_none()
    }
}

// =============================================================================
// STATE
// =============================================================================

/// Authoritative bridge state.
///
/// `pause_timestamp` is the single source of truth for pause status, so
/// "paused" and "has a pause timestamp" cannot disagree.
#[derive(Debug, Clone)]
pub struct BridgeState {
    /// Admin key.
    pub authority: PublicKey,
    /// Current validator set.
    pub validators: BTreeSet<PublicKey>,
    /// Signatures required per instruction.
    pub threshold: u8,
    /// Fee in basis points.
    pub fee_rate_bps: u16,
    /// Rolling window cap.
    pub daily_limit: u64,
    /// Minimum pause duration.
    pub emergency_delay_secs: u64,
    /// Finalized instruction counter.
    pub nonce: u64,
    /// Value locked on the source chain.
    pub total_locked: u64,
    /// Fees credited to the collector.
    pub total_fees_collected: u64,
    /// Set while paused.
    pub pause_timestamp: Option<Timestamp>,
    pub(crate) window: RollingVolumeWindow,
    pub(crate) consumed: HashSet<ReplayKey>,
}

impl BridgeState {
    /// Fresh state from validated parameters.
    pub(crate) fn new(params: &InitializeParams, window_secs: u64) -> Self {
        Self {
            authority: params.authority,
            validators: params.validators.iter().copied().collect(),
            threshold: params.threshold,
            fee_rate_bps: params.fee_rate_bps,
            daily_limit: params.daily_limit,
            emergency_delay_secs: params.emergency_delay_secs,
            nonce: 0,
            total_locked: 0,
            total_fees_collected: 0,
            pause_timestamp: None,
            window: RollingVolumeWindow::new(window_secs),
            consumed: HashSet::new(),
        }
    }

    /// Whether the bridge is paused.
    pub fn is_paused(&self) -> bool {
        self.pause_timestamp.is_some()
    }

    /// Whether `key` was already finalized.
    pub fn is_consumed(&self, key: &ReplayKey) -> bool {
        self.consumed.contains(key)
    }

    /// Read-only snapshot.
    pub fn view(&self, now: Timestamp) -> BridgeStateView {
        BridgeStateView {
            authority: self.authority,
            validators: self.validators.iter().copied().collect(),
            threshold: self.threshold,
            fee_rate_bps: self.fee_rate_bps,
            daily_limit: self.daily_limit,
            emergency_delay_secs: self.emergency_delay_secs,
            nonce: self.nonce,
            total_locked: self.total_locked,
            total_fees_collected: self.total_fees_collected,
            is_paused: self.is_paused(),
            pause_timestamp: self.pause_timestamp,
            window_volume: self.window.volume(now),
        }
    }
}

/// Serializable snapshot of `BridgeState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStateView {
    /// Admin key.
    pub authority: PublicKey,
    /// Validator set, sorted.
    pub validators: Vec<PublicKey>,
    /// Threshold.
    pub threshold: u8,
    /// Fee rate.
    pub fee_rate_bps: u16,
    /// Daily limit.
    pub daily_limit: u64,
    /// Emergency delay.
    pub emergency_delay_secs: u64,
    /// Nonce.
    pub nonce: u64,
    /// Total locked.
    pub total_locked: u64,
    /// Fees collected.
    pub total_fees_collected: u64,
    /// Pause flag.
    pub is_paused: bool,
    /// Pause time.
    pub pause_timestamp: Option<Timestamp>,
    /// Volume inside the current rolling window.
    pub window_volume: u64,
}

impl BridgeStateView {
    /// Whether `id` is in the validator set.
    pub fn is_validator(&self, id: &ValidatorId) -> bool {
        self.validators.contains(id.as_bytes())
    }
}

// =============================================================================
// RECEIPTS & EVENTS
// =============================================================================

/// Result of a finalized deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    /// Nonce after finalization.
    pub nonce: u64,
    /// Gross amount locked.
    pub amount: u64,
    /// Fee credited to the collector.
    pub fee: u64,
    /// Amount credited to the recipient.
    pub net_amount: u64,
    /// Recipient account.
    pub recipient: AccountId,
    /// Consumed source event.
    pub source_event: SourceEventId,
    /// Finalization time.
    pub timestamp: Timestamp,
}

/// Result of a finalized withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawReceipt {
    /// Nonce after finalization.
    pub nonce: u64,
    /// Gross amount burned.
    pub amount: u64,
    /// Fee credited to the collector.
    pub fee: u64,
    /// Amount released on the source chain.
    pub net_amount: u64,
    /// Release destination.
    pub destination: NockAddress,
    /// Consumed request id.
    pub request_id: Hash,
    /// Finalization time.
    pub timestamp: Timestamp,
}

/// Result of a pause, unpause or config update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminReceipt {
    /// Nonce after finalization.
    pub nonce: u64,
    /// Finalization time.
    pub timestamp: Timestamp,
    /// Validators whose signatures were counted.
    pub signers: Vec<PublicKey>,
}

/// Events emitted by finalized instructions, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgramEvent {
    /// Wrapped tokens credited.
    Deposit(DepositReceipt),
    /// Wrapped tokens burned, release recorded.
    Withdraw(WithdrawReceipt),
    /// Bridge paused.
    EmergencyPause(AdminReceipt),
    /// Bridge unpaused.
    Unpause {
        /// Receipt.
        receipt: AdminReceipt,
        /// Whether the delay override path was used.
        overridden: bool,
    },
    /// Configuration changed.
    ConfigUpdate {
        /// Receipt.
        receipt: AdminReceipt,
        /// Applied update.
        update: ConfigUpdate,
    },
}

// =============================================================================
// STATISTICS
// =============================================================================

/// Running bridge statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Gross volume deposited (Nockchain to settlement chain).
    pub deposit_volume: u64,
    /// Gross volume withdrawn (settlement chain to Nockchain).
    pub withdrawal_volume: u64,
    /// Finalized deposits.
    pub deposit_count: u64,
    /// Finalized withdrawals.
    pub withdrawal_count: u64,
    /// Fees collected.
    pub total_fees_collected: u64,
    /// Highest rolling-window volume seen.
    pub peak_window_volume: u64,
    /// Largest single transfer.
    pub largest_transaction: u64,
    /// Counted signatures per validator.
    pub signatures_provided: HashMap<ValidatorId, u64>,
}

impl BridgeStats {
    /// Total finalized transfers.
    pub fn total_transactions(&self) -> u64 {
        self.deposit_count.saturating_add(self.withdrawal_count)
    }

    /// Mean transfer size, zero before the first transfer.
    pub fn average_transaction_size(&self) -> u64 {
        let count = self.total_transactions();
        if count == 0 {
            return 0;
        }
        self.deposit_volume.saturating_add(self.withdrawal_volume) / count
    }

    pub(crate) fn record_transfer(&mut self, amount: u64, fee: u64, deposit: bool, peak: u64) {
        if deposit {
            self.deposit_volume = self.deposit_volume.saturating_add(amount);
            self.deposit_count = self.deposit_count.saturating_add(1);
        } else {
            self.withdrawal_volume = self.withdrawal_volume.saturating_add(amount);
            self.withdrawal_count = self.withdrawal_count.saturating_add(1);
        }
        self.total_fees_collected = self.total_fees_collected.saturating_add(fee);
        self.largest_transaction = self.largest_transaction.max(amount);
        self.peak_window_volume = self.peak_window_volume.max(peak);
    }

    pub(crate) fn record_signers(&mut self, signers: &[PublicKey]) {
        for key in signers {
            *self
                .signatures_provided
                .entry(ValidatorId::from_public_key(*key))
                .or_insert(0) += 1;
        }
    }
}

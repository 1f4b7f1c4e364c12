//! # Inbound Ports
//!
//! API trait of the settlement program, as seen by bridge coordinators.

use crate::domain::{
    AdminReceipt, BridgeStateView, BridgeStats, ConfigUpdate, DepositInstruction,
    DepositReceipt, InitializeParams, ProgramError, ProgramEvent, ReplayKey,
    WithdrawInstruction, WithdrawReceipt,
};
use async_trait::async_trait;
use shared_types::ValidatorSignature;

/// Settlement program API - inbound port.
///
/// Every state-changing call either finalizes completely (nonce + 1, one
/// event) or leaves the program untouched.
#[async_trait]
pub trait SettlementProgramApi: Send + Sync {
    /// Uninitialized to Active.
    async fn initialize_bridge(&self, params: InitializeParams) -> Result<(), ProgramError>;

    /// Credit wrapped tokens for a source-chain lock.
    async fn deposit_nock(
        &self,
        instruction: DepositInstruction,
        signatures: Vec<ValidatorSignature>,
    ) -> Result<DepositReceipt, ProgramError>;

    /// Burn wrapped tokens and record the source-chain release.
    async fn withdraw_nock(
        &self,
        instruction: WithdrawInstruction,
        signatures: Vec<ValidatorSignature>,
    ) -> Result<WithdrawReceipt, ProgramError>;

    /// Active to Paused.
    async fn emergency_pause(
        &self,
        signatures: Vec<ValidatorSignature>,
    ) -> Result<AdminReceipt, ProgramError>;

    /// Paused to Active, after the emergency delay.
    async fn unpause_bridge(
        &self,
        signatures: Vec<ValidatorSignature>,
    ) -> Result<AdminReceipt, ProgramError>;

    /// Paused to Active before the delay, when the program allows it.
    async fn unpause_bridge_override(
        &self,
        signatures: Vec<ValidatorSignature>,
    ) -> Result<AdminReceipt, ProgramError>;

    /// Atomically apply a config change signed by the current set.
    async fn update_bridge_config(
        &self,
        update: ConfigUpdate,
        signatures: Vec<ValidatorSignature>,
    ) -> Result<AdminReceipt, ProgramError>;

    /// Snapshot of the bridge state.
    async fn state(&self) -> Result<BridgeStateView, ProgramError>;

    /// Running statistics.
    async fn stats(&self) -> BridgeStats;

    /// Events emitted after the first `from` events.
    async fn events_since(&self, from: usize) -> Vec<ProgramEvent>;

    /// Whether a deposit event or withdrawal request is already finalized.
    async fn is_consumed(&self, key: ReplayKey) -> bool;
}

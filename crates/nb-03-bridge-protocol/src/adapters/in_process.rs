//! In-process settlement adapter.
//!
//! Serializes every instruction through one mutex, the way a chain
//! serializes transactions into blocks, and supplies the clock.

use crate::domain::{
    AdminReceipt, BridgeStateView, BridgeStats, ConfigUpdate, DepositInstruction,
    DepositReceipt, InitializeParams, ProgramError, ProgramEvent, ProgramPolicy, ReplayKey,
    WithdrawInstruction, WithdrawReceipt,
};
use crate::ports::{SettlementProgramApi, TokenLedger};
use crate::service::BridgeProgram;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{SharedTimeSource, ValidatorSignature};
use std::sync::Arc;

/// `SettlementProgramApi` over a local `BridgeProgram`.
pub struct InProcessSettlement {
    program: Mutex<BridgeProgram>,
    time: SharedTimeSource,
}

impl InProcessSettlement {
    /// Wrap a fresh, uninitialized program.
    pub fn new(policy: ProgramPolicy, ledger: Arc<dyn TokenLedger>, time: SharedTimeSource) -> Self {
        Self {
            program: Mutex::new(BridgeProgram::new(policy, ledger)),
            time,
        }
    }

    /// Run `f` with exclusive access to the program.
    pub fn with_program<R>(&self, f: impl FnOnce(&mut BridgeProgram) -> R) -> R {
        f(&mut self.program.lock())
    }
}

#[async_trait]
impl SettlementProgramApi for InProcessSettlement {
    async fn initialize_bridge(&self, params: InitializeParams) -> Result<(), ProgramError> {
        self.program.lock().initialize_bridge(params)
    }

    async fn deposit_nock(
        &self,
        instruction: DepositInstruction,
        signatures: Vec<ValidatorSignature>,
    ) -> Result<DepositReceipt, ProgramError> {
        let now = self.time.now();
        self.program
            .lock()
            .deposit_nock(&instruction, &signatures, now)
    }

    async fn withdraw_nock(
        &self,
        instruction: WithdrawInstruction,
        signatures: Vec<ValidatorSignature>,
    ) -> Result<WithdrawReceipt, ProgramError> {
        let now = self.time.now();
        self.program
            .lock()
            .withdraw_nock(&instruction, &signatures, now)
    }

    async fn emergency_pause(
        &self,
        signatures: Vec<ValidatorSignature>,
    ) -> Result<AdminReceipt, ProgramError> {
        let now = self.time.now();
        self.program.lock().emergency_pause(&signatures, now)
    }

    async fn unpause_bridge(
        &self,
        signatures: Vec<ValidatorSignature>,
    ) -> Result<AdminReceipt, ProgramError> {
        let now = self.time.now();
        self.program.lock().unpause_bridge(&signatures, now)
    }

    async fn unpause_bridge_override(
        &self,
        signatures: Vec<ValidatorSignature>,
    ) -> Result<AdminReceipt, ProgramError> {
        let now = self.time.now();
        self.program.lock().unpause_bridge_override(&signatures, now)
    }

    async fn update_bridge_config(
        &self,
        update: ConfigUpdate,
        signatures: Vec<ValidatorSignature>,
    ) -> Result<AdminReceipt, ProgramError> {
        let now = self.time.now();
        self.program
            .lock()
            .update_bridge_config(&update, &signatures, now)
    }

    async fn state(&self) -> Result<BridgeStateView, ProgramError> {
        self.program.lock().view(self.time.now())
    }

    async fn stats(&self) -> BridgeStats {
        self.program.lock().stats().clone()
    }

    async fn events_since(&self, from: usize) -> Vec<ProgramEvent> {
        let program = self.program.lock();
        program.events().get(from..).map(<[_]>::to_vec).unwrap_or_default()
    }

    async fn is_consumed(&self, key: ReplayKey) -> bool {
        self.program.lock().is_consumed(&key)
    }
}

//! # NB-03 Bridge Transaction Protocol
//!
//! The settlement-chain program that mints and burns wrapped NOCK under
//! threshold validator signatures.
//!
//! **Subsystem ID:** 3
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## State Machine
//!
//! ```text
//! Uninitialized ──initialize_bridge──→ Active ──emergency_pause──→ Paused
//!                                        ↑                           │
//!                                        └──unpause_bridge(_override)┘
//! ```
//!
//! ## Guarantees
//!
//! | Property | Enforcement |
//! |----------|-------------|
//! | Threshold authorization | `verify_signature_set` over a domain-separated message |
//! | Replay protection | Consumed set of source events and withdrawal request ids |
//! | Volume cap | 24 h rolling window of individual entries |
//! | Admin replay | Pause, unpause and config messages bind the nonce |
//! | Atomicity | All checks before any mutation; ledger batch is all-or-nothing |
//!
//! ## Module Structure
//!
//! ```text
//! nb-03-bridge-protocol/
//! ├── domain/       # State, instructions, receipts, invariants, window
//! ├── algorithms/   # Canonical messages, signature sets, fees
//! ├── ports/        # SettlementProgramApi, TokenLedger
//! ├── adapters/     # InMemoryTokenLedger, InProcessSettlement
//! └── service       # BridgeProgram
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{InMemoryTokenLedger, InProcessSettlement};
pub use algorithms::{
    compute_fee, config_update_message, deposit_message, instruction_digest, pause_message,
    unpause_message, unpause_override_message, verify_signature_set, withdraw_message,
};
pub use domain::{
    AccountId, AdminReceipt, BridgeState, BridgeStateView, BridgeStats, ConfigUpdate,
    DepositInstruction, DepositReceipt, InitializeParams, NockAddress, ProgramError,
    ProgramEvent, ProgramPolicy, ProtocolLimits, ReplayKey, SourceEventId, SourceProof,
    UnpausePolicy, WithdrawInstruction, WithdrawReceipt, BPS_DENOMINATOR, DAY_SECS,
    UNITS_PER_NOCK, WRAPPED_DECIMALS,
};
pub use ports::{LedgerError, LedgerOp, SettlementProgramApi, TokenLedger};
pub use service::BridgeProgram;

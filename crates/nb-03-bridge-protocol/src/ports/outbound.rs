//! # Outbound Ports
//!
//! The wrapped-token ledger the settlement program mints into and burns from.

use crate::domain::{AccountId, ProgramError};
use thiserror::Error;

/// One balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOp {
    /// Credit `amount` to `account`.
    Mint {
        /// Credited account.
        account: AccountId,
        /// Amount in base units.
        amount: u64,
    },
    /// Debit `amount` from `account`.
    Burn {
        /// Debited account.
        account: AccountId,
        /// Amount in base units.
        amount: u64,
    },
}

/// Ledger failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Burn larger than the account balance.
    #[error("Insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance {
        /// Amount to burn.
        needed: u64,
        /// Current balance.
        available: u64,
    },

    /// Mint would overflow a balance or the supply.
    #[error("Supply overflow")]
    SupplyOverflow,
}

impl From<LedgerError> for ProgramError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance { needed, available } => {
                ProgramError::InsufficientBalance { needed, available }
            }
            LedgerError::SupplyOverflow => ProgramError::ArithmeticOverflow,
        }
    }
}

/// Wrapped-token ledger - outbound port.
///
/// `apply` is all-or-nothing: if any op fails, no balance changes.
pub trait TokenLedger: Send + Sync {
    /// Apply a batch of balance changes atomically, in order.
    fn apply(&self, ops: &[LedgerOp]) -> Result<(), LedgerError>;

    /// Balance of `account`.
    fn balance(&self, account: &AccountId) -> u64;

    /// Total wrapped supply.
    fn total_supply(&self) -> u64;
}

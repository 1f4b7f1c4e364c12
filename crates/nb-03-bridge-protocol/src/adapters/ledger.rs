//! In-memory wrapped-token ledger.

use crate::domain::AccountId;
use crate::ports::{LedgerError, LedgerOp, TokenLedger};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Balances {
    accounts: HashMap<AccountId, u64>,
    supply: u64,
}

/// `TokenLedger` held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryTokenLedger {
    inner: Mutex<Balances>,
}

impl InMemoryTokenLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn apply(&self, ops: &[LedgerOp]) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock();

        // Work on a copy of the touched balances; commit only if all succeed.
        let mut staged: HashMap<AccountId, u64> = HashMap::new();
        let mut supply = inner.supply;
        for op in ops {
            match *op {
                LedgerOp::Mint { account, amount } => {
                    let current = staged
                        .get(&account)
                        .copied()
                        .unwrap_or_else(|| inner.accounts.get(&account).copied().unwrap_or(0));
                    let next = current
                        .checked_add(amount)
                        .ok_or(LedgerError::SupplyOverflow)?;
                    supply = supply
                        .checked_add(amount)
                        .ok_or(LedgerError::SupplyOverflow)?;
                    staged.insert(account, next);
                }
                LedgerOp::Burn { account, amount } => {
                    let current = staged
                        .get(&account)
                        .copied()
                        .unwrap_or_else(|| inner.accounts.get(&account).copied().unwrap_or(0));
                    let next =
                        current
                            .checked_sub(amount)
                            .ok_or(LedgerError::InsufficientBalance {
                                needed: amount,
                                available: current,
                            })?;
                    supply = supply.saturating_sub(amount);
                    staged.insert(account, next);
                }
            }
        }

        inner.accounts.extend(staged);
        inner.supply = supply;
        Ok(())
    }

    fn balance(&self, account: &AccountId) -> u64 {
        self.inner.lock().accounts.get(account).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> u64 {
        self.inner.lock().supply
    }
}

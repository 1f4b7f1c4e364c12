//! # Adapters
//!
//! - `ledger`: in-memory wrapped-token ledger
//! - `in_process`: mutex-serialized settlement program with a clock

pub mod in_process;
pub mod ledger;

pub use in_process::InProcessSettlement;
pub use ledger::InMemoryTokenLedger;

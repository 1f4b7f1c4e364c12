//! # Adapters
//!
//! Glue between subsystems that never reference each other directly.
//!
//! - `tamper`: store integrity failures become `data_corruption` threats
//! - `security_feed`: per-source counters and the network security snapshot

pub mod security_feed;
pub mod tamper;

pub use security_feed::{security_snapshot, SourceCounterBook};
pub use tamper::{SecurityTamperObserver, STORE_SOURCE};

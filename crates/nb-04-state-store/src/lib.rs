//! # NB-04 Shared State Store
//!
//! Encrypted, integrity-tagged key families shared by all validators.
//!
//! **Subsystem ID:** 4
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Key Families
//!
//! | Family | Key | TTL |
//! |--------|-----|-----|
//! | Validator registry | `validators:<id>` | 5 min, refreshed on heartbeat |
//! | Consensus messages | `consensus:<round>:<id>` | 1 h |
//! | Round claims | `claims:<round>` | 30 s |
//! | Pending transactions | `pending` (FIFO) | none, drained explicitly |
//! | Emergency mode | `emergency` | none, cleared explicitly |
//! | Metrics samples | `metrics:<ts>:<seq>` | 24 h |
//!
//! All backend keys carry the `nockbridge:` namespace, stripped from listings.
//!
//! ## Module Structure
//!
//! ```text
//! nb-04-state-store/
//! ├── domain/     # StoreConfig, KeyFamily, records, errors
//! ├── ports/      # KeyValueBackend, TamperObserver
//! ├── adapters/   # InMemoryBackend
//! └── service     # SecureStateStore
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::InMemoryBackend;
pub use domain::{
    BackendError, EmergencyFlag, KeyFamily, StoreConfig, StoreError, ValidatorRecord,
    DEFAULT_NAMESPACE,
};
pub use ports::{KeyValueBackend, TamperObserver};
pub use service::SecureStateStore;

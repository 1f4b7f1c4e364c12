//! Domain layer for the Shared State Store.

pub mod entities;
pub mod errors;
pub mod keys;

pub use entities::{EmergencyFlag, ValidatorRecord};
pub use errors::{BackendError, StoreError};
pub use keys::{KeyFamily, StoreConfig, DEFAULT_NAMESPACE};

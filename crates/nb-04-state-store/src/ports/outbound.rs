//! # Outbound Ports
//!
//! The backend contract: any durable key-value store with per-key expiry,
//! atomic increment and FIFO lists satisfies it.

use crate::domain::BackendError;
use async_trait::async_trait;
use std::time::Duration;

/// Key-value backend - outbound port.
///
/// Read-modify-write sequences are the backend's job: `incr` and
/// `set_if_absent` must be atomic with respect to all other callers.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Read a value. Expired keys read as absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError>;

    /// Write a value with an optional TTL.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
        -> Result<(), BackendError>;

    /// Write only if the key is absent. Returns `true` if written.
    async fn set_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<bool, BackendError>;

    /// Delete a key. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> Result<bool, BackendError>;

    /// Atomically add `by` to an integer counter, creating it at zero.
    async fn incr(&self, key: &str, by: i64) -> Result<i64, BackendError>;

    /// All live keys starting with `prefix`, in lexicographic order.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, BackendError>;

    /// Append to a FIFO list. Returns the new length.
    async fn push_back(&self, key: &str, value: Vec<u8>) -> Result<usize, BackendError>;

    /// Pop the oldest list element.
    async fn pop_front(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError>;

    /// Length of a FIFO list.
    async fn list_len(&self, key: &str) -> Result<usize, BackendError>;
}

/// Receives integrity failures detected on read.
///
/// Implementations must not block; the store calls this inline.
pub trait TamperObserver: Send + Sync {
    /// A value at `key` failed its integrity check.
    fn on_integrity_violation(&self, key: &str);
}

//! In-Memory Backend Adapter
//!
//! Implements `KeyValueBackend` in process memory. Expiry is lazy: expired
//! entries read as absent and are dropped on the next write or `purge_expired`.
//! One mutex covers all maps, so every operation is atomic.

use crate::domain::BackendError;
use crate::ports::KeyValueBackend;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{SharedTimeSource, SystemTimeSource, Timestamp};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Timestamp>,
}

impl Entry {
    fn is_live(&self, now: Timestamp) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

#[derive(Debug, Default)]
struct Inner {
    values: BTreeMap<String, Entry>,
    lists: HashMap<String, VecDeque<Vec<u8>>>,
}

/// In-memory key-value backend.
pub struct InMemoryBackend {
    inner: Mutex<Inner>,
    time: SharedTimeSource,
}

impl InMemoryBackend {
    /// Backend on the system clock.
    pub fn new() -> Self {
        Self::with_time_source(Arc::new(SystemTimeSource::new()))
    }

    /// Backend on an injected clock.
    pub fn with_time_source(time: SharedTimeSource) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            time,
        }
    }

    /// Drop all expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.time.now();
        let mut inner = self.inner.lock();
        let before = inner.values.len();
        inner.values.retain(|_, e| e.is_live(now));
        before - inner.values.len()
    }

    /// Raw stored bytes, bypassing the secure layer.
    pub fn raw_get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.lock().values.get(key).map(|e| e.value.clone())
    }

    /// Mutate stored bytes in place, simulating tampering or disk corruption.
    ///
    /// Returns `false` if the key does not exist.
    pub fn tamper<F: FnOnce(&mut Vec<u8>)>(&self, key: &str, f: F) -> bool {
        match self.inner.lock().values.get_mut(key) {
            Some(entry) => {
                f(&mut entry.value);
                true
            }
            None => false,
        }
    }

    fn expiry(&self, ttl: Option<Duration>) -> Option<Timestamp> {
        ttl.map(|d| {
            let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
            self.time.now().add_secs(secs)
        })
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let now = self.time.now();
        let inner = self.inner.lock();
        Ok(inner
            .values
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        let expires_at = self.expiry(ttl);
        self.inner
            .lock()
            .values
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<bool, BackendError> {
        let now = self.time.now();
        let expires_at = self.expiry(ttl);
        let mut inner = self.inner.lock();
        if inner.values.get(key).is_some_and(|e| e.is_live(now)) {
            return Ok(false);
        }
        inner
            .values
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool, BackendError> {
        let now = self.time.now();
        let mut inner = self.inner.lock();
        let removed_value = inner.values.remove(key).is_some_and(|e| e.is_live(now));
        let removed_list = inner.lists.remove(key).is_some();
        Ok(removed_value || removed_list)
    }

    async fn incr(&self, key: &str, by: i64) -> Result<i64, BackendError> {
        let now = self.time.now();
        let mut inner = self.inner.lock();
        let current = match inner.values.get(key).filter(|e| e.is_live(now)) {
            Some(entry) => std::str::from_utf8(&entry.value)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or_else(|| BackendError::WrongType(key.to_string()))?,
            None => 0,
        };
        let next = current.saturating_add(by);
        let expires_at = inner
            .values
            .get(key)
            .filter(|e| e.is_live(now))
            .and_then(|e| e.expires_at);
        inner.values.insert(
            key.to_string(),
            Entry {
                value: next.to_string().into_bytes(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let now = self.time.now();
        let inner = self.inner.lock();
        let mut keys: Vec<String> = inner
            .values
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .filter(|(_, e)| e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.extend(
            inner
                .lists
                .iter()
                .filter(|(k, list)| k.starts_with(prefix) && !list.is_empty())
                .map(|(k, _)| k.clone()),
        );
        keys.sort();
        debug!("[nb-04] keys({}) -> {} entries", prefix, keys.len());
        Ok(keys)
    }

    async fn push_back(&self, key: &str, value: Vec<u8>) -> Result<usize, BackendError> {
        let mut inner = self.inner.lock();
        let list = inner.lists.entry(key.to_string()).or_default();
        list.push_back(value);
        Ok(list.len())
    }

    async fn pop_front(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let mut inner = self.inner.lock();
        Ok(inner.lists.get_mut(key).and_then(|list| list.pop_front()))
    }

    async fn list_len(&self, key: &str) -> Result<usize, BackendError> {
        Ok(self.inner.lock().lists.get(key).map_or(0, |l| l.len()))
    }
}

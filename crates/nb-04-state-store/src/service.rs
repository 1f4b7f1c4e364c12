//! # Secure State Store Service
//!
//! Typed key families over any `KeyValueBackend`. Every value is serialized
//! to JSON and sealed with XChaCha20-Poly1305 before it leaves the process;
//! the backend key is bound as associated data, so a value moved to another
//! key fails authentication just like a flipped byte.
//!
//! ## Read path
//!
//! A failed tag check is a tamper event, not a parse error: the read fails
//! with `StoreError::IntegrityViolation` and the `TamperObserver` is told.
//! Listings skip (and report) tampered entries so one bad record cannot hide
//! the rest of a round.
//!
//! ## Counters
//!
//! `next_sequence` relies on the backend's atomic `incr`. Counters are plain
//! integers because the backend has to do the arithmetic.

use crate::domain::{
    EmergencyFlag, KeyFamily, StoreConfig, StoreError, ValidatorRecord,
};
use crate::ports::{KeyValueBackend, TamperObserver};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_crypto::{open, seal, SecretKey};
use shared_types::ValidatorId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Envelope format version prefixed to every sealed value.
const ENVELOPE_VERSION: u8 = 1;

/// Encrypting, integrity-checking state store.
pub struct SecureStateStore {
    backend: Arc<dyn KeyValueBackend>,
    key: SecretKey,
    config: StoreConfig,
    observer: Option<Arc<dyn TamperObserver>>,
    closed: AtomicBool,
}

impl SecureStateStore {
    /// Create a store sealing values under `key`.
    ///
    /// Every validator sharing the store must use the same key.
    pub fn new(backend: Arc<dyn KeyValueBackend>, key: SecretKey, config: StoreConfig) -> Self {
        Self {
            backend,
            key,
            config,
            observer: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Report integrity failures to `observer`.
    pub fn with_tamper_observer(mut self, observer: Arc<dyn TamperObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Begin shutdown: all later writes fail with `StoreError::Closed`.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("[nb-04] State store closed for writes");
        }
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // =========================================================================
    // VALIDATOR REGISTRY
    // =========================================================================

    /// Register or refresh a validator (resets its TTL).
    pub async fn put_validator(&self, record: &ValidatorRecord) -> Result<(), StoreError> {
        let logical =
            StoreConfig::logical_key(KeyFamily::ValidatorRegistry, &record.validator_id.to_hex());
        self.put(KeyFamily::ValidatorRegistry, &logical, record).await
    }

    /// Look up one validator.
    pub async fn get_validator(
        &self,
        id: &ValidatorId,
    ) -> Result<Option<ValidatorRecord>, StoreError> {
        let logical = StoreConfig::logical_key(KeyFamily::ValidatorRegistry, &id.to_hex());
        self.get(&logical).await
    }

    /// All live validator records.
    pub async fn list_validators(&self) -> Result<Vec<ValidatorRecord>, StoreError> {
        let prefix = StoreConfig::logical_key(KeyFamily::ValidatorRegistry, "");
        self.list(&format!("{prefix}:")).await
    }

    // =========================================================================
    // CONSENSUS MESSAGES
    // =========================================================================

    /// Publish one validator's message for a round (overwrites that
    /// validator's previous message for the same round).
    pub async fn publish_consensus_message<T: Serialize>(
        &self,
        round: &str,
        validator: &ValidatorId,
        message: &T,
    ) -> Result<(), StoreError> {
        let logical = StoreConfig::logical_key(
            KeyFamily::ConsensusMessages,
            &format!("{round}:{}", validator.to_hex()),
        );
        self.put(KeyFamily::ConsensusMessages, &logical, message)
            .await
    }

    /// All live messages of a round, in key order.
    pub async fn consensus_messages<T: DeserializeOwned>(
        &self,
        round: &str,
    ) -> Result<Vec<T>, StoreError> {
        let prefix =
            StoreConfig::logical_key(KeyFamily::ConsensusMessages, &format!("{round}:"));
        self.list(&prefix).await
    }

    /// Round ids with at least one live message.
    pub async fn open_rounds(&self) -> Result<Vec<String>, StoreError> {
        let family = format!("{}:", KeyFamily::ConsensusMessages.segment());
        let mut rounds: Vec<String> = self
            .list_keys(&family)
            .await?
            .into_iter()
            .filter_map(|k| {
                let rest = k.strip_prefix(&family)?;
                rest.rsplit_once(':').map(|(round, _)| round.to_string())
            })
            .collect();
        rounds.dedup();
        Ok(rounds)
    }

    /// Claim the right to submit a round's finalize instruction.
    ///
    /// Returns `true` for the first claimant until the claim TTL lapses.
    pub async fn claim_round(&self, round: &str, validator: &ValidatorId) -> Result<bool, StoreError> {
        self.ensure_open()?;
        let logical = StoreConfig::logical_key(KeyFamily::RoundClaims, round);
        let sealed = self.seal_value(&logical, validator)?;
        let claimed = self
            .backend
            .set_if_absent(
                &self.config.backend_key(&logical),
                sealed,
                self.config.ttl_for(KeyFamily::RoundClaims),
            )
            .await?;
        debug!("[nb-04] claim {} by {} -> {}", round, validator, claimed);
        Ok(claimed)
    }

    // =========================================================================
    // PENDING-TRANSACTION QUEUE
    // =========================================================================

    /// Append to the pending queue. Returns the queue length.
    pub async fn enqueue_pending<T: Serialize>(&self, item: &T) -> Result<usize, StoreError> {
        self.ensure_open()?;
        let logical = StoreConfig::logical_key(KeyFamily::PendingTransactions, "");
        let sealed = self.seal_value(&logical, item)?;
        Ok(self
            .backend
            .push_back(&self.config.backend_key(&logical), sealed)
            .await?)
    }

    /// Pop the oldest pending item.
    ///
    /// Popping removes the item from the shared queue, so it counts as a write.
    pub async fn dequeue_pending<T: DeserializeOwned>(&self) -> Result<Option<T>, StoreError> {
        self.ensure_open()?;
        let logical = StoreConfig::logical_key(KeyFamily::PendingTransactions, "");
        match self
            .backend
            .pop_front(&self.config.backend_key(&logical))
            .await?
        {
            Some(bytes) => self.open_value(&logical, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Number of queued items.
    pub async fn pending_len(&self) -> Result<usize, StoreError> {
        let logical = StoreConfig::logical_key(KeyFamily::PendingTransactions, "");
        Ok(self
            .backend
            .list_len(&self.config.backend_key(&logical))
            .await?)
    }

    // =========================================================================
    // EMERGENCY MODE
    // =========================================================================

    /// Raise the emergency flag. It stays until `clear_emergency_mode`.
    pub async fn set_emergency_mode(&self, flag: &EmergencyFlag) -> Result<(), StoreError> {
        warn!(
            "[nb-04] Emergency mode raised by {}: {}",
            flag.raised_by, flag.reason
        );
        let logical = StoreConfig::logical_key(KeyFamily::EmergencyMode, "");
        self.put(KeyFamily::EmergencyMode, &logical, flag).await
    }

    /// Current emergency flag, if raised.
    pub async fn emergency_mode(&self) -> Result<Option<EmergencyFlag>, StoreError> {
        let logical = StoreConfig::logical_key(KeyFamily::EmergencyMode, "");
        self.get(&logical).await
    }

    /// Clear the emergency flag. Returns `true` if it was set.
    pub async fn clear_emergency_mode(&self) -> Result<bool, StoreError> {
        self.ensure_open()?;
        let logical = StoreConfig::logical_key(KeyFamily::EmergencyMode, "");
        info!("[nb-04] Emergency mode cleared");
        Ok(self
            .backend
            .delete(&self.config.backend_key(&logical))
            .await?)
    }

    // =========================================================================
    // METRICS SAMPLES
    // =========================================================================

    /// Store a metrics sample under a time-ordered key.
    pub async fn record_metrics_sample<T: Serialize>(
        &self,
        timestamp_secs: u64,
        sample: &T,
    ) -> Result<(), StoreError> {
        let seq = self.next_sequence("metrics").await?;
        let logical = StoreConfig::logical_key(
            KeyFamily::MetricsSamples,
            &format!("{timestamp_secs:020}:{seq:012}"),
        );
        self.put(KeyFamily::MetricsSamples, &logical, sample).await
    }

    /// Live metrics samples, oldest first.
    pub async fn metrics_samples<T: DeserializeOwned>(&self) -> Result<Vec<T>, StoreError> {
        let prefix = format!("{}:", KeyFamily::MetricsSamples.segment());
        self.list(&prefix).await
    }

    // =========================================================================
    // COUNTERS & KEYS
    // =========================================================================

    /// Atomically increment a named counter and return the new value.
    pub async fn next_sequence(&self, name: &str) -> Result<i64, StoreError> {
        self.ensure_open()?;
        let logical = StoreConfig::logical_key(KeyFamily::Sequences, name);
        Ok(self
            .backend
            .incr(&self.config.backend_key(&logical), 1)
            .await?)
    }

    /// Live keys under a caller-visible prefix, namespace stripped.
    pub async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let keys = self
            .backend
            .keys(&self.config.backend_key(prefix))
            .await?;
        Ok(keys
            .iter()
            .map(|k| self.config.strip_namespace(k).to_string())
            .collect())
    }

    // =========================================================================
    // SEALING
    // =========================================================================

    async fn put<T: Serialize + ?Sized>(
        &self,
        family: KeyFamily,
        logical: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        self.ensure_open()?;
        let sealed = self.seal_value(logical, value)?;
        self.backend
            .set(
                &self.config.backend_key(logical),
                sealed,
                self.config.ttl_for(family),
            )
            .await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, logical: &str) -> Result<Option<T>, StoreError> {
        match self.backend.get(&self.config.backend_key(logical)).await? {
            Some(bytes) => self.open_value(logical, &bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn list<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>, StoreError> {
        let mut values = Vec::new();
        for logical in self.list_keys(prefix).await? {
            match self.get::<T>(&logical).await {
                Ok(Some(value)) => values.push(value),
                // Expired between listing and read.
                Ok(None) => {}
                Err(StoreError::IntegrityViolation { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(values)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn seal_value<T: Serialize + ?Sized>(
        &self,
        logical: &str,
        value: &T,
    ) -> Result<Vec<u8>, StoreError> {
        let json = serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let aad = self.config.backend_key(logical);
        let sealed = seal(&self.key, &json, aad.as_bytes())
            .map_err(|e| StoreError::Encryption(e.to_string()))?;

        let mut out = Vec::with_capacity(1 + sealed.len());
        out.push(ENVELOPE_VERSION);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn open_value<T: DeserializeOwned>(&self, logical: &str, bytes: &[u8]) -> Result<T, StoreError> {
        let aad = self.config.backend_key(logical);
        let plaintext = match bytes.split_first() {
            Some((&ENVELOPE_VERSION, sealed)) => open(&self.key, sealed, aad.as_bytes()).ok(),
            _ => None,
        };

        let Some(plaintext) = plaintext else {
            error!("[nb-04] Integrity check failed for key {}", logical);
            if let Some(observer) = &self.observer {
                observer.on_integrity_violation(logical);
            }
            return Err(StoreError::IntegrityViolation {
                key: logical.to_string(),
            });
        };

        serde_json::from_slice(&plaintext).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

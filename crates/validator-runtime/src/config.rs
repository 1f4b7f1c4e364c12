//! # Validator Configuration
//!
//! One TOML file with a section per subsystem, then `NB_*` environment
//! overrides, then validation.
//!
//! ```toml
//! [node]
//! name = "validator-1"
//! signing_seed = "<64 hex chars>"
//! listen_address = "0.0.0.0:7400"
//!
//! [[network.peers]]
//! id = "validator-2"
//! address = "10.0.0.2:7400"
//! public_key = "<64 hex chars>"
//!
//! [network.monitor]
//! heartbeat_interval_secs = 30
//!
//! [security]
//! level = "high"
//! emergency_contacts = ["ops@example.org"]
//!
//! [bridge]
//! validators = ["<hex>", "<hex>", "<hex>"]
//! threshold = 2
//!
//! [store]
//! encryption_key = "<64 hex chars>"
//!
//! [scheduler]
//! round_poll_secs = 5
//! ```
//!
//! ## Security Requirements
//!
//! - `node.signing_seed` and `store.encryption_key` MUST NOT be the zero
//!   default in production
//! - `security.emergency_contacts` MUST NOT be empty in production

use nb_01_network_monitor::MonitorConfig;
use nb_02_security_manager::{SecurityConfig, SecurityLevel};
use nb_03_bridge_protocol::{ProgramPolicy, UnpausePolicy, UNITS_PER_NOCK};
use nb_04_state_store::{StoreConfig, DEFAULT_NAMESPACE};
use serde::{Deserialize, Serialize};
use shared_types::PublicKey;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

const ZERO_KEY_HEX: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Cannot read {path}: {reason}")]
    Io {
        /// File path.
        path: String,
        /// OS error text.
        reason: String,
    },

    /// The config file is not valid TOML for this schema.
    #[error("Invalid config file: {0}")]
    Parse(String),

    /// A hex field did not decode to 32 bytes.
    #[error("Invalid {field}: {reason}")]
    InvalidKey {
        /// Field name.
        field: String,
        /// Decoding error.
        reason: String,
    },

    /// A value is out of range or inconsistent.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Signing seed is the zero default.
    #[error(
        "SECURITY VIOLATION: signing seed is the default zero value. \
         Set NB_SIGNING_SEED or node.signing_seed."
    )]
    InsecureSigningSeed,

    /// Store key is the zero default.
    #[error(
        "SECURITY VIOLATION: store encryption key is the default zero value. \
         Set NB_STORE_KEY or store.encryption_key."
    )]
    InsecureStoreKey,

    /// Nobody would hear about a lockdown.
    #[error("No emergency contacts configured")]
    NoEmergencyContacts,
}

/// Complete validator configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// This validator's identity.
    pub node: NodeSection,
    /// Peer set and monitor tuning.
    pub network: NetworkSection,
    /// Security manager settings.
    pub security: SecurityConfig,
    /// Settlement program parameters.
    pub bridge: BridgeSection,
    /// Shared state store settings.
    pub store: StoreSection,
    /// Periodic job intervals.
    pub scheduler: SchedulerSection,
}

/// Node identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    /// Human-readable name used in logs.
    pub name: String,
    /// Ed25519 seed, 64 hex chars. MUST be overridden in production.
    pub signing_seed: String,
    /// Address the peer listener binds. Empty disables inbound links.
    pub listen_address: String,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            name: "validator".to_string(),
            signing_seed: ZERO_KEY_HEX.to_string(),
            listen_address: "0.0.0.0:7400".to_string(),
        }
    }
}

/// One statically configured validator peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEntry {
    /// Peer id used in alerts.
    pub id: String,
    /// `host:port` of the peer listener.
    pub address: String,
    /// Peer's Ed25519 public key, 64 hex chars.
    pub public_key: String,
}

impl PeerEntry {
    /// Decoded public key.
    pub fn public_key_bytes(&self) -> Result<PublicKey, ConfigError> {
        decode_key(&format!("network.peers[{}].public_key", self.id), &self.public_key)
    }
}

/// Peer network section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSection {
    /// Other validators.
    pub peers: Vec<PeerEntry>,
    /// Monitor tuning.
    pub monitor: MonitorConfig,
}

/// Settlement program parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSection {
    /// Validator public keys (hex). Empty means a single-validator dev bridge.
    pub validators: Vec<String>,
    /// Signatures required per instruction.
    pub threshold: u8,
    /// Fee in basis points.
    pub fee_rate_bps: u16,
    /// Rolling 24 h volume cap in base units.
    pub daily_limit: u64,
    /// Minimum time between pause and unpause.
    pub emergency_delay_secs: u64,
    /// Whether a threshold set may unpause early.
    pub unpause_policy: UnpausePolicy,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            validators: Vec::new(),
            threshold: 1,
            fee_rate_bps: 50,
            daily_limit: 1_000_000 * UNITS_PER_NOCK,
            emergency_delay_secs: 24 * 3_600,
            unpause_policy: UnpausePolicy::EnforceDelay,
        }
    }
}

impl BridgeSection {
    /// Decoded validator keys.
    pub fn validator_keys(&self) -> Result<Vec<PublicKey>, ConfigError> {
        self.validators
            .iter()
            .enumerate()
            .map(|(i, hex)| decode_key(&format!("bridge.validators[{i}]"), hex))
            .collect()
    }

    /// Program policy for an in-process settlement program.
    pub fn policy(&self) -> ProgramPolicy {
        ProgramPolicy {
            unpause: self.unpause_policy,
            ..ProgramPolicy::default()
        }
    }
}

/// Shared state store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Key prefix.
    pub namespace: String,
    /// XChaCha20-Poly1305 key shared by all validators, 64 hex chars.
    pub encryption_key: String,
    /// Validator registry TTL.
    pub validator_ttl_secs: u64,
    /// Consensus message TTL.
    pub consensus_ttl_secs: u64,
    /// Round claim TTL.
    pub claim_ttl_secs: u64,
    /// Metrics sample TTL.
    pub metrics_ttl_secs: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        let store = StoreConfig::default();
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            encryption_key: ZERO_KEY_HEX.to_string(),
            validator_ttl_secs: store.validator_ttl.as_secs(),
            consensus_ttl_secs: store.consensus_ttl.as_secs(),
            claim_ttl_secs: store.claim_ttl.as_secs(),
            metrics_ttl_secs: store.metrics_ttl.as_secs(),
        }
    }
}

impl StoreSection {
    /// Store configuration for `SecureStateStore`.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            namespace: self.namespace.clone(),
            validator_ttl: Duration::from_secs(self.validator_ttl_secs),
            consensus_ttl: Duration::from_secs(self.consensus_ttl_secs),
            claim_ttl: Duration::from_secs(self.claim_ttl_secs),
            metrics_ttl: Duration::from_secs(self.metrics_ttl_secs),
        }
    }
}

/// Periodic job intervals, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// Network metric collection.
    pub metrics_interval_secs: u64,
    /// Health assessment and gauge refresh.
    pub health_check_secs: u64,
    /// Alert auto-resolution sweep.
    pub alert_sweep_secs: u64,
    /// Threat and quarantine garbage collection.
    pub threat_gc_secs: u64,
    /// Key rotation due-check.
    pub key_rotation_check_secs: u64,
    /// Pending-queue drain.
    pub pending_drain_secs: u64,
    /// Open round polling.
    pub round_poll_secs: u64,
    /// Validator registry heartbeat.
    pub registry_refresh_secs: u64,
    /// Network security scan.
    pub security_scan_secs: u64,
    /// Pending items handled per drain.
    pub max_drain_batch: usize,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            metrics_interval_secs: 60,
            health_check_secs: 30,
            alert_sweep_secs: 300,
            threat_gc_secs: 3_600,
            key_rotation_check_secs: 300,
            pending_drain_secs: 5,
            round_poll_secs: 5,
            registry_refresh_secs: 60,
            security_scan_secs: 60,
            max_drain_batch: 32,
        }
    }
}

impl SchedulerSection {
    fn intervals(&self) -> [(&'static str, u64); 9] {
        [
            ("metrics_interval_secs", self.metrics_interval_secs),
            ("health_check_secs", self.health_check_secs),
            ("alert_sweep_secs", self.alert_sweep_secs),
            ("threat_gc_secs", self.threat_gc_secs),
            ("key_rotation_check_secs", self.key_rotation_check_secs),
            ("pending_drain_secs", self.pending_drain_secs),
            ("round_poll_secs", self.round_poll_secs),
            ("registry_refresh_secs", self.registry_refresh_secs),
            ("security_scan_secs", self.security_scan_secs),
        ]
    }
}

impl ValidatorConfig {
    /// Load from an optional TOML file, apply `NB_*` overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing sections and fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&text)
    }

    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `NB_NODE_NAME` | `node.name` |
    /// | `NB_SIGNING_SEED` | `node.signing_seed` (hex) |
    /// | `NB_LISTEN_ADDRESS` | `node.listen_address` |
    /// | `NB_STORE_KEY` | `store.encryption_key` (hex) |
    /// | `NB_SECURITY_LEVEL` | `security.level` |
    /// | `NB_EMERGENCY_CONTACTS` | `security.emergency_contacts` (comma-separated) |
    ///
    /// Secrets are checked as they are read so a bad value is reported
    /// under its variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("NB_NODE_NAME") {
            self.node.name = name;
        }
        if let Some(seed) = lookup("NB_SIGNING_SEED") {
            decode_key("NB_SIGNING_SEED", &seed)?;
            self.node.signing_seed = seed;
        }
        if let Some(address) = lookup("NB_LISTEN_ADDRESS") {
            self.node.listen_address = address;
        }
        if let Some(key) = lookup("NB_STORE_KEY") {
            decode_key("NB_STORE_KEY", &key)?;
            self.store.encryption_key = key;
        }
        if let Some(level) = lookup("NB_SECURITY_LEVEL") {
            self.security.level = match level.to_ascii_lowercase().as_str() {
                "standard" => SecurityLevel::Standard,
                "high" => SecurityLevel::High,
                "maximum" => SecurityLevel::Maximum,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "NB_SECURITY_LEVEL '{other}' (expected standard, high or maximum)"
                    )))
                }
            };
        }
        if let Some(contacts) = lookup("NB_EMERGENCY_CONTACTS") {
            self.security.emergency_contacts = contacts
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(())
    }

    /// Structural checks every deployment must pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.signing_seed()?;
        self.store_key()?;
        for peer in &self.network.peers {
            peer.public_key_bytes()?;
        }
        self.network
            .monitor
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("network.monitor: {e}")))?;

        let validators = self.bridge.validator_keys()?;
        if !validators.is_empty() {
            let n = validators.len();
            let min = n.div_ceil(2).max(1);
            let t = usize::from(self.bridge.threshold);
            if t < min || t > n {
                return Err(ConfigError::Invalid(format!(
                    "bridge.threshold {t} must be in {min}..={n} for {n} validators"
                )));
            }
        }
        if self.bridge.fee_rate_bps > 10_000 {
            return Err(ConfigError::Invalid(format!(
                "bridge.fee_rate_bps {} exceeds 10000",
                self.bridge.fee_rate_bps
            )));
        }
        if self.bridge.daily_limit == 0 {
            return Err(ConfigError::Invalid("bridge.daily_limit must be > 0".into()));
        }

        for (name, secs) in self.scheduler.intervals() {
            if secs == 0 {
                return Err(ConfigError::Invalid(format!("scheduler.{name} must be > 0")));
            }
        }
        if self.scheduler.max_drain_batch == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.max_drain_batch must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Reject development defaults.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.signing_seed()? == [0u8; 32] {
            return Err(ConfigError::InsecureSigningSeed);
        }
        if self.store_key()? == [0u8; 32] {
            return Err(ConfigError::InsecureStoreKey);
        }
        if self.security.emergency_contacts.is_empty() {
            return Err(ConfigError::NoEmergencyContacts);
        }
        Ok(())
    }

    /// Decoded signing seed.
    pub fn signing_seed(&self) -> Result<[u8; 32], ConfigError> {
        decode_key("node.signing_seed", &self.node.signing_seed)
    }

    /// Decoded store key.
    pub fn store_key(&self) -> Result<[u8; 32], ConfigError> {
        decode_key("store.encryption_key", &self.store.encryption_key)
    }
}

fn decode_key(field: &str, value: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(value.trim()).map_err(|e| ConfigError::InvalidKey {
        field: field.to_string(),
        reason: e.to_string(),
    })?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| ConfigError::InvalidKey {
            field: field.to_string(),
            reason: format!("expected 32 bytes, got {}", bytes.len()),
        })
}

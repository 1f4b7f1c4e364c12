//! # Key Families
//!
//! Every value lives under `<namespace><family>:<id>`. Callers never see the
//! namespace: listings strip it before returning.

use std::time::Duration;

/// Default namespace prefix.
pub const DEFAULT_NAMESPACE: &str = "nockbridge:";

/// The key families of the shared store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    /// Validator registry, refreshed on heartbeat.
    ValidatorRegistry,
    /// Per-round consensus messages.
    ConsensusMessages,
    /// Round finalization claims.
    RoundClaims,
    /// Pending-transaction FIFO, drained explicitly.
    PendingTransactions,
    /// Emergency-mode flag, cleared explicitly.
    EmergencyMode,
    /// Rolling metrics samples.
    MetricsSamples,
    /// Atomic counters.
    Sequences,
}

impl KeyFamily {
    /// Key segment for this family.
    pub fn segment(&self) -> &'static str {
        match self {
            KeyFamily::ValidatorRegistry => "validators",
            KeyFamily::ConsensusMessages => "consensus",
            KeyFamily::RoundClaims => "claims",
            KeyFamily::PendingTransactions => "pending",
            KeyFamily::EmergencyMode => "emergency",
            KeyFamily::MetricsSamples => "metrics",
            KeyFamily::Sequences => "seq",
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Prefix applied to every backend key.
    pub namespace: String,
    /// Validator registry TTL.
    pub validator_ttl: Duration,
    /// Consensus message TTL (bounds how long a round can collect signatures).
    pub consensus_ttl: Duration,
    /// Round claim TTL.
    pub claim_ttl: Duration,
    /// Metrics sample TTL.
    pub metrics_ttl: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            validator_ttl: Duration::from_secs(5 * 60),
            consensus_ttl: Duration::from_secs(60 * 60),
            claim_ttl: Duration::from_secs(30),
            metrics_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl StoreConfig {
    /// TTL applied to writes in `family`. `None` means no expiry.
    pub fn ttl_for(&self, family: KeyFamily) -> Option<Duration> {
        match family {
            KeyFamily::ValidatorRegistry => Some(self.validator_ttl),
            KeyFamily::ConsensusMessages => Some(self.consensus_ttl),
            KeyFamily::RoundClaims => Some(self.claim_ttl),
            KeyFamily::MetricsSamples => Some(self.metrics_ttl),
            KeyFamily::PendingTransactions | KeyFamily::EmergencyMode | KeyFamily::Sequences => {
                None
            }
        }
    }

    /// Caller-visible key for `family` and `id`.
    pub fn logical_key(family: KeyFamily, id: &str) -> String {
        if id.is_empty() {
            family.segment().to_string()
        } else {
            format!("{}:{}", family.segment(), id)
        }
    }

    /// Backend key: namespace + logical key.
    pub fn backend_key(&self, logical: &str) -> String {
        format!("{}{}", self.namespace, logical)
    }

    /// Strip the namespace from a backend key.
    pub fn strip_namespace<'a>(&self, backend_key: &'a str) -> &'a str {
        backend_key
            .strip_prefix(self.namespace.as_str())
            .unwrap_or(backend_key)
    }
}

//! Shipped estimator implementations.

use crate::algorithms::{subnet_of, RollingStats};
use crate::domain::ThreatType;
use crate::ports::{AnomalyDetector, PayloadInspector, ReputationSource, SybilEstimator};
use parking_lot::{Mutex, RwLock};
use shared_types::{Severity, ValidatorId};
use std::collections::HashMap;

// =============================================================================
// REPUTATION
// =============================================================================

/// Explicit per-source scores with severity-scaled penalties.
#[derive(Debug)]
pub struct ReputationBook {
    default_score: f64,
    scores: RwLock<HashMap<String, f64>>,
}

impl ReputationBook {
    /// Book where unknown sources score `default_score`.
    pub fn new(default_score: f64) -> Self {
        Self {
            default_score: default_score.clamp(0.0, 1.0),
            scores: RwLock::new(HashMap::new()),
        }
    }

    /// Set a score explicitly.
    pub fn set(&self, source: &str, score: f64) {
        self.scores
            .write()
            .insert(source.to_string(), score.clamp(0.0, 1.0));
    }

    fn penalty(threat: ThreatType) -> f64 {
        match threat.severity_floor() {
            Severity::Low => 0.05,
            Severity::Medium => 0.1,
            Severity::High => 0.2,
            Severity::Critical => 0.4,
        }
    }
}

impl ReputationSource for ReputationBook {
    fn reputation(&self, source: &str) -> f64 {
        self.scores
            .read()
            .get(source)
            .copied()
            .unwrap_or(self.default_score)
    }

    fn penalize(&self, source: &str, threat: ThreatType) -> f64 {
        let mut scores = self.scores.write();
        let score = scores
            .entry(source.to_string())
            .or_insert(self.default_score);
        *score = (*score - Self::penalty(threat)).max(0.0);
        *score
    }
}

// =============================================================================
// ANOMALY
// =============================================================================

/// Flags amounts more than `z_limit` standard deviations from the rolling
/// mean of recent amounts.
#[derive(Debug)]
pub struct ZScoreAnomalyDetector {
    z_limit: f64,
    min_samples: usize,
    window: Mutex<RollingStats>,
}

impl ZScoreAnomalyDetector {
    /// Detector over the last `window` amounts.
    pub fn new(window: usize, min_samples: usize, z_limit: f64) -> Self {
        Self {
            z_limit,
            min_samples,
            window: Mutex::new(RollingStats::new(window)),
        }
    }
}

impl Default for ZScoreAnomalyDetector {
    fn default() -> Self {
        Self::new(256, 16, 3.0)
    }
}

impl AnomalyDetector for ZScoreAnomalyDetector {
    fn observe(&self, _source: &str, amount: u64) -> bool {
        let mut window = self.window.lock();
        let value = amount as f64;
        let anomalous = window.len() >= self.min_samples
            && window.z_score(value).is_some_and(|z| z > self.z_limit);
        window.push(value);
        anomalous
    }
}

// =============================================================================
// SYBIL
// =============================================================================

/// Risk from how many registered validators share a subnet.
///
/// Risk is the share of the other validators in the same subnet, so a lone
/// validator per subnet scores 0 and a set entirely in one subnet scores 1.
#[derive(Debug, Default)]
pub struct SubnetSybilEstimator {
    addresses: RwLock<HashMap<ValidatorId, String>>,
}

impl SubnetSybilEstimator {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a validator's network address.
    pub fn register(&self, validator: ValidatorId, address: &str) {
        self.addresses.write().insert(validator, address.to_string());
    }

    /// Forget a validator.
    pub fn unregister(&self, validator: &ValidatorId) {
        self.addresses.write().remove(validator);
    }
}

impl SybilEstimator for SubnetSybilEstimator {
    fn sybil_risk(&self, validator: &ValidatorId) -> f64 {
        let addresses = self.addresses.read();
        let Some(own) = addresses.get(validator).and_then(|a| subnet_of(a)) else {
            return 0.0;
        };
        let others = addresses.len().saturating_sub(1);
        if others == 0 {
            return 0.0;
        }
        let shared = addresses
            .iter()
            .filter(|(id, _)| *id != validator)
            .filter(|(_, addr)| subnet_of(addr).as_deref() == Some(own.as_str()))
            .count();
        shared as f64 / others as f64
    }
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// Case-insensitive substring matcher over payload bytes.
#[derive(Debug, Clone)]
pub struct PatternInspector {
    patterns: Vec<Vec<u8>>,
}

impl PatternInspector {
    /// Inspector for `patterns`.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().to_ascii_lowercase().into_bytes())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }
}

impl Default for PatternInspector {
    fn default() -> Self {
        Self::new(["<script", "drop table", "' or '1'='1", "../", "${jndi:"])
    }
}

impl PayloadInspector for PatternInspector {
    fn inspect(&self, payload: &[u8]) -> Option<String> {
        let lowered = payload.to_ascii_lowercase();
        self.patterns
            .iter()
            .find(|p| lowered.windows(p.len()).any(|w| w == p.as_slice()))
            .map(|p| String::from_utf8_lossy(p).into_owned())
    }
}

//! # Outbound Ports
//!
//! Pluggable estimators behind the security checks, and the notification
//! sink used for emergency contacts.

use crate::domain::{Notification, ThreatType};
use shared_types::ValidatorId;

/// Reputation scores in `[0, 1]`.
pub trait ReputationSource: Send + Sync {
    /// Score of `source`. Unknown sources get the source's default.
    fn reputation(&self, source: &str) -> f64;

    /// Lower the score after a threat attributed to `source`. Returns the new score.
    fn penalize(&self, source: &str, threat: ThreatType) -> f64;
}

/// Flags unusual transaction amounts.
pub trait AnomalyDetector: Send + Sync {
    /// Whether `amount` from `source` is anomalous. Records the sample.
    fn observe(&self, source: &str, amount: u64) -> bool;
}

/// Estimates the chance a validator identity is one of many controlled by
/// one party.
pub trait SybilEstimator: Send + Sync {
    /// Risk in `[0, 1]`.
    fn sybil_risk(&self, validator: &ValidatorId) -> f64;
}

/// Scans payloads for known attack patterns.
pub trait PayloadInspector: Send + Sync {
    /// First matched pattern, if any.
    fn inspect(&self, payload: &[u8]) -> Option<String>;
}

/// Fire-and-forget delivery to emergency contacts.
///
/// Implementations must not block; delivery is best-effort.
pub trait NotificationSink: Send + Sync {
    /// Deliver or drop `notification`.
    fn notify(&self, notification: Notification);
}

//! # Alerts
//!
//! Append-only alert log. Timestamps never go backwards, and the only
//! mutation of a recorded alert is setting its resolution. Resolved alerts
//! are dropped once they pass the retention period.

use serde::{Deserialize, Serialize};
use shared_types::{Severity, Timestamp};
use std::fmt;
use uuid::Uuid;

/// Alert kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Average latency above threshold.
    HighLatency,
    /// Packet loss above threshold.
    PacketLoss,
    /// Health score below threshold.
    NetworkDegradation,
    /// Connected share below quorum.
    NetworkPartition,
    /// A peer exhausted its reconnect attempts.
    ValidatorOffline,
    /// The monitor itself failed.
    SystemError,
    /// Raised on behalf of the security manager or a peer.
    SecurityIncident,
}

impl AlertType {
    /// Whether the sweep may resolve this kind once its condition clears.
    pub fn auto_resolvable(&self) -> bool {
        matches!(
            self,
            AlertType::HighLatency
                | AlertType::PacketLoss
                | AlertType::NetworkDegradation
                | AlertType::NetworkPartition
        )
    }

    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::HighLatency => "high_latency",
            AlertType::PacketLoss => "packet_loss",
            AlertType::NetworkDegradation => "network_degradation",
            AlertType::NetworkPartition => "network_partition",
            AlertType::ValidatorOffline => "validator_offline",
            AlertType::SystemError => "system_error",
            AlertType::SecurityIncident => "security_incident",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAlert {
    /// Unique id.
    pub id: Uuid,
    /// Kind.
    pub alert_type: AlertType,
    /// Severity.
    pub severity: Severity,
    /// Description.
    pub message: String,
    /// Peer id, or `"network"` for network-wide conditions.
    pub source: String,
    /// Raise time.
    pub timestamp: Timestamp,
    /// Resolution time, if resolved.
    pub resolved_at: Option<Timestamp>,
}

impl NetworkAlert {
    /// Whether the alert is resolved.
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}

/// Append-only alert store.
#[derive(Debug, Default)]
pub struct AlertLog {
    alerts: Vec<NetworkAlert>,
}

impl AlertLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an alert stamped no earlier than the last one.
    pub fn append(
        &mut self,
        alert_type: AlertType,
        severity: Severity,
        message: impl Into<String>,
        source: impl Into<String>,
        now: Timestamp,
    ) -> NetworkAlert {
        let timestamp = self
            .alerts
            .last()
            .map_or(now, |last| last.timestamp.max(now));
        let alert = NetworkAlert {
            id: Uuid::new_v4(),
            alert_type,
            severity,
            message: message.into(),
            source: source.into(),
            timestamp,
            resolved_at: None,
        };
        self.alerts.push(alert.clone());
        alert
    }

    /// Unresolved alert of this kind and source, if any.
    pub fn find_active(&self, alert_type: AlertType, source: &str) -> Option<&NetworkAlert> {
        self.alerts
            .iter()
            .find(|a| a.alert_type == alert_type && a.source == source && !a.is_resolved())
    }

    /// Resolve by id. `Some(false)` if it was already resolved.
    pub fn resolve(&mut self, id: Uuid, now: Timestamp) -> Option<bool> {
        let alert = self.alerts.iter_mut().find(|a| a.id == id)?;
        if alert.is_resolved() {
            return Some(false);
        }
        alert.resolved_at = Some(now);
        Some(true)
    }

    /// Resolve every unresolved alert matching `predicate`. Returns the count.
    pub fn resolve_where(
        &mut self,
        now: Timestamp,
        mut predicate: impl FnMut(&NetworkAlert) -> bool,
    ) -> usize {
        let mut resolved = 0;
        for alert in self.alerts.iter_mut().filter(|a| !a.is_resolved()) {
            if predicate(alert) {
                alert.resolved_at = Some(now);
                resolved += 1;
            }
        }
        resolved
    }

    /// Drop alerts resolved at least `retention_secs` ago. Returns the count.
    pub fn prune_resolved(&mut self, now: Timestamp, retention_secs: u64) -> usize {
        let before = self.alerts.len();
        self.alerts.retain(|a| match a.resolved_at {
            Some(resolved) => now.secs_since(resolved) < retention_secs,
            None => true,
        });
        before - self.alerts.len()
    }

    /// Unresolved alerts, oldest first.
    pub fn active(&self) -> Vec<NetworkAlert> {
        self.alerts
            .iter()
            .filter(|a| !a.is_resolved())
            .cloned()
            .collect()
    }

    /// All alerts, oldest first.
    pub fn all(&self) -> &[NetworkAlert] {
        &self.alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_never_go_backwards() {
        let mut log = AlertLog::new();
        log.append(AlertType::HighLatency, Severity::Medium, "a", "network", Timestamp::new(100));
        let second = log.append(AlertType::PacketLoss, Severity::Medium, "b", "network", Timestamp::new(90));
        assert_eq!(second.timestamp, Timestamp::new(100));
    }

    #[test]
    fn test_resolve_once() {
        let mut log = AlertLog::new();
        let alert = log.append(AlertType::SystemError, Severity::Critical, "x", "monitor", Timestamp::new(1));
        assert_eq!(log.resolve(alert.id, Timestamp::new(2)), Some(true));
        assert_eq!(log.resolve(alert.id, Timestamp::new(3)), Some(false));
        assert_eq!(log.resolve(Uuid::new_v4(), Timestamp::new(3)), None);
        assert!(log.active().is_empty());
        assert_eq!(log.all()[0].resolved_at, Some(Timestamp::new(2)));
    }

    #[test]
    fn test_prune_keeps_active_and_recent() {
        let mut log = AlertLog::new();
        let old = log.append(AlertType::HighLatency, Severity::Medium, "a", "network", Timestamp::new(10));
        let recent = log.append(AlertType::PacketLoss, Severity::Medium, "b", "network", Timestamp::new(20));
        log.append(AlertType::SystemError, Severity::Critical, "c", "monitor", Timestamp::new(30));
        log.resolve(old.id, Timestamp::new(100));
        log.resolve(recent.id, Timestamp::new(500));

        assert_eq!(log.prune_resolved(Timestamp::new(599), 500), 0);
        assert_eq!(log.prune_resolved(Timestamp::new(600), 500), 1);
        let kinds: Vec<AlertType> = log.all().iter().map(|a| a.alert_type).collect();
        assert_eq!(kinds, vec![AlertType::PacketLoss, AlertType::SystemError]);

        // Unresolved alerts stay however old they are.
        assert_eq!(log.prune_resolved(Timestamp::new(100_000), 500), 1);
        assert_eq!(log.active().len(), 1);
        assert_eq!(log.all().len(), 1);
    }

    #[test]
    fn test_operator_only_kinds() {
        assert!(!AlertType::ValidatorOffline.auto_resolvable());
        assert!(!AlertType::SystemError.auto_resolvable());
        assert!(!AlertType::SecurityIncident.auto_resolvable());
        assert!(AlertType::NetworkPartition.auto_resolvable());
    }
}

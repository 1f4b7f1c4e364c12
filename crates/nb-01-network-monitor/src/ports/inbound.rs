//! # Inbound Ports
//!
//! API trait defining what the network monitor can do.

use crate::domain::{
    AlertType, MetricsSample, MonitorError, NetworkAlert, NetworkHealth, NetworkTopology,
    ValidatorPeer,
};
use async_trait::async_trait;
use shared_types::{PublicKey, Severity};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Network monitor API - inbound port.
#[async_trait]
pub trait NetworkMonitorApi: Send + Sync {
    /// Register a peer and start its connection task.
    async fn add_peer(
        &self,
        id: &str,
        address: &str,
        public_key: PublicKey,
    ) -> Result<ValidatorPeer, MonitorError>;

    /// Unregister a peer and stop its connection task.
    async fn remove_peer(&self, id: &str) -> Result<ValidatorPeer, MonitorError>;

    /// Store a sample and raise threshold alerts. Returns the alerts raised.
    async fn record_metrics(&self, sample: MetricsSample) -> Vec<NetworkAlert>;

    /// Current derived topology.
    async fn network_topology(&self) -> NetworkTopology;

    /// Weighted health assessment.
    async fn assess_network_health(&self) -> NetworkHealth;

    /// Append an alert.
    async fn create_alert(
        &self,
        alert_type: AlertType,
        severity: Severity,
        message: &str,
        source: &str,
    ) -> NetworkAlert;

    /// Resolve an alert. Returns whether it was unresolved.
    async fn resolve_alert(&self, id: Uuid) -> Result<bool, MonitorError>;

    /// Auto-resolve stale alerts whose condition cleared. Returns the count.
    async fn sweep_alerts(&self) -> usize;

    /// Record how many of the expected validators took part in a round.
    async fn record_consensus_round(&self, participants: usize, expected: usize);

    /// Unresolved alerts, oldest first.
    async fn active_alerts(&self) -> Vec<NetworkAlert>;

    /// One peer.
    async fn peer(&self, id: &str) -> Option<ValidatorPeer>;

    /// All peers, sorted by id.
    async fn peers(&self) -> Vec<ValidatorPeer>;

    /// Subscribe to raised alerts. Lagging subscribers lose old alerts.
    fn subscribe(&self) -> broadcast::Receiver<NetworkAlert>;
}

//! # Domain Entities
//!
//! Peers, metric samples and the derived topology and health views.

use crate::algorithms::connection_quality;
use serde::{Deserialize, Serialize};
use shared_types::{PublicKey, Timestamp};

/// Starting and maximum peer reputation.
pub const MAX_PEER_REPUTATION: u8 = 100;

/// Reputation lost per peer error.
pub const ERROR_REPUTATION_PENALTY: u8 = 1;

/// A validator peer as seen by this node.
///
/// Reputation only ever goes down here; restoring it is an operator action
/// (remove and re-add the peer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorPeer {
    /// Peer id.
    pub id: String,
    /// Dial address (`host:port`).
    pub address: String,
    /// Ed25519 public key.
    pub public_key: PublicKey,
    /// Last message or successful heartbeat.
    pub last_seen: Option<Timestamp>,
    /// Whether a link is currently up.
    pub is_connected: bool,
    /// Last heartbeat round-trip.
    pub latency_ms: u64,
    /// Diagnostic quality score, 0-100.
    pub connection_quality: u8,
    /// Messages written to the link.
    pub messages_sent: u64,
    /// Messages read from the link.
    pub messages_received: u64,
    /// Timeouts, malformed lines and link failures.
    pub errors: u64,
    /// 0-100, decremented on every error.
    pub reputation: u8,
}

impl ValidatorPeer {
    /// Freshly registered, not yet connected peer.
    pub fn new(id: impl Into<String>, address: impl Into<String>, public_key: PublicKey) -> Self {
        let mut peer = Self {
            id: id.into(),
            address: address.into(),
            public_key,
            last_seen: None,
            is_connected: false,
            latency_ms: 0,
            connection_quality: 0,
            messages_sent: 0,
            messages_received: 0,
            errors: 0,
            reputation: MAX_PEER_REPUTATION,
        };
        peer.refresh_quality();
        peer
    }

    /// Link established.
    pub fn mark_connected(&mut self, now: Timestamp) {
        self.is_connected = true;
        self.last_seen = Some(now);
        self.refresh_quality();
    }

    /// Link lost.
    pub fn mark_disconnected(&mut self) {
        self.is_connected = false;
        self.refresh_quality();
    }

    /// Heartbeat answered after `rtt_ms`.
    pub fn record_latency(&mut self, rtt_ms: u64, now: Timestamp) {
        self.latency_ms = rtt_ms;
        self.last_seen = Some(now);
        self.refresh_quality();
    }

    /// A message was written.
    pub fn record_sent(&mut self) {
        self.messages_sent = self.messages_sent.saturating_add(1);
    }

    /// A message was read.
    pub fn record_received(&mut self, now: Timestamp) {
        self.messages_received = self.messages_received.saturating_add(1);
        self.last_seen = Some(now);
    }

    /// Timeout, malformed line or link failure.
    pub fn record_error(&mut self) {
        self.errors = self.errors.saturating_add(1);
        self.reputation = self.reputation.saturating_sub(ERROR_REPUTATION_PENALTY);
        self.refresh_quality();
    }

    fn refresh_quality(&mut self) {
        self.connection_quality = connection_quality(self.latency_ms, self.errors, self.is_connected);
    }
}

/// One network metrics sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSample {
    /// Collection time.
    pub timestamp: Timestamp,
    /// Average round-trip latency over connected peers.
    pub latency_ms: f64,
    /// Share of heartbeats lost, 0-1.
    pub packet_loss: f64,
    /// Messages per second.
    pub throughput: f64,
}

/// Derived network view. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkTopology {
    /// Registered peers.
    pub total_validators: usize,
    /// Peers with a live link.
    pub connected_validators: usize,
    /// Mean latency of connected peers.
    pub average_latency_ms: f64,
    /// Connected share below quorum.
    pub partition_detected: bool,
    /// Mean participation over recent consensus rounds, 0-1.
    pub consensus_efficiency: f64,
    /// Weighted health score, 0-100.
    pub health_score: f64,
}

/// Health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Score of at least 80.
    Healthy,
    /// Score of at least 50.
    Degraded,
    /// Anything lower.
    Critical,
}

impl HealthStatus {
    /// Classify a 0-100 score.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            HealthStatus::Healthy
        } else if score >= 50.0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Critical
        }
    }
}

/// Component scores of the health assessment, each 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthComponents {
    /// Connected share.
    pub connectivity: f64,
    /// Latency and throughput of recent samples.
    pub performance: f64,
    /// Inverse packet loss and error rate.
    pub reliability: f64,
    /// Consensus participation.
    pub consensus: f64,
}

/// Result of `assess_network_health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkHealth {
    /// Weighted score, 0-100.
    pub score: f64,
    /// Classification of `score`.
    pub status: HealthStatus,
    /// Inputs to `score`.
    pub components: HealthComponents,
    /// Human-readable problems.
    pub issues: Vec<String>,
}

//! # Monitor Configuration

use serde::{Deserialize, Serialize};

/// Fraction of connected validators below which the network is partitioned.
///
/// Compared in integer arithmetic: `connected * den < total * num`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quorum {
    /// Numerator.
    pub num: u32,
    /// Denominator, never zero.
    pub den: u32,
}

impl Quorum {
    /// `num / den`.
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Whether this is a proper fraction in `(0, 1]`.
    pub fn is_valid(&self) -> bool {
        self.den > 0 && self.num > 0 && self.num <= self.den
    }
}

impl Default for Quorum {
    fn default() -> Self {
        Self::new(2, 3)
    }
}

/// Network monitor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between heartbeats on each connection.
    pub heartbeat_interval_secs: u64,
    /// Seconds to wait for a heartbeat response.
    pub heartbeat_timeout_secs: u64,
    /// Reconnect attempts after a failure before the peer is reported offline.
    pub max_reconnect_attempts: u32,
    /// Fixed wait between reconnect attempts.
    pub reconnect_backoff_secs: u64,
    /// Partition threshold.
    pub quorum: Quorum,
    /// Alerts older than this are candidates for auto-resolution.
    pub max_alert_age_secs: u64,
    /// Resolved alerts are dropped from the log this long after resolution.
    pub resolved_alert_retention_secs: u64,
    /// Average latency above this raises `high_latency`.
    pub latency_alert_ms: f64,
    /// Packet loss ratio above this raises `packet_loss`.
    pub packet_loss_alert: f64,
    /// Health score below this raises `network_degradation`.
    pub degraded_health_score: f64,
    /// Throughput (messages per second) that scores full performance.
    pub expected_throughput: f64,
    /// Consensus rounds kept for the participation average.
    pub consensus_window: usize,
    /// Metric samples kept.
    pub sample_capacity: usize,
    /// Samples averaged into the performance and reliability scores.
    pub recent_samples: usize,
    /// Broadcast channel capacity for alerts.
    pub event_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 5,
            max_reconnect_attempts: 5,
            reconnect_backoff_secs: 5,
            quorum: Quorum::default(),
            max_alert_age_secs: 3_600,
            resolved_alert_retention_secs: 7 * 24 * 3_600,
            latency_alert_ms: 1_000.0,
            packet_loss_alert: 0.05,
            degraded_health_score: 50.0,
            expected_throughput: 10.0,
            consensus_window: 20,
            sample_capacity: 1_440,
            recent_samples: 10,
            event_capacity: 256,
        }
    }
}

impl MonitorConfig {
    /// Short timers for tests.
    pub fn for_testing() -> Self {
        Self {
            heartbeat_interval_secs: 2,
            heartbeat_timeout_secs: 1,
            max_reconnect_attempts: 2,
            reconnect_backoff_secs: 1,
            max_alert_age_secs: 60,
            resolved_alert_retention_secs: 600,
            consensus_window: 4,
            sample_capacity: 16,
            recent_samples: 3,
            ..Self::default()
        }
    }

    /// Reject settings the monitor cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if !self.quorum.is_valid() {
            return Err(format!(
                "quorum {}/{} must be in (0, 1]",
                self.quorum.num, self.quorum.den
            ));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err("heartbeat_interval_secs must be positive".into());
        }
        if self.heartbeat_timeout_secs == 0
            || self.heartbeat_timeout_secs >= self.heartbeat_interval_secs
        {
            return Err("heartbeat_timeout_secs must be positive and below the interval".into());
        }
        if !(0.0..=1.0).contains(&self.packet_loss_alert) {
            return Err("packet_loss_alert must be a ratio".into());
        }
        if self.expected_throughput <= 0.0 {
            return Err("expected_throughput must be positive".into());
        }
        if self.consensus_window == 0 || self.sample_capacity == 0 || self.recent_samples == 0 {
            return Err("windows must be non-empty".into());
        }
        Ok(())
    }
}

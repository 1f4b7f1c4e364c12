//! Weighted network health score.
//!
//! ```text
//! score = 0.3 * connectivity + 0.3 * performance
//!       + 0.2 * reliability  + 0.2 * consensus
//! ```

use super::quality::latency_score;
use crate::domain::{HealthComponents, MetricsSample};

/// Weight of the connected share.
pub const CONNECTIVITY_WEIGHT: f64 = 0.3;
/// Weight of latency and throughput.
pub const PERFORMANCE_WEIGHT: f64 = 0.3;
/// Weight of inverse loss.
pub const RELIABILITY_WEIGHT: f64 = 0.2;
/// Weight of consensus participation.
pub const CONSENSUS_WEIGHT: f64 = 0.2;

/// Inputs to the health assessment.
#[derive(Debug, Clone, Copy)]
pub struct HealthInputs<'a> {
    /// Connected peers.
    pub connected: usize,
    /// Registered peers.
    pub total: usize,
    /// Most recent samples, any order.
    pub recent: &'a [MetricsSample],
    /// Peer-table latency, used when there are no samples.
    pub peer_latency_ms: f64,
    /// Peer-table error ratio, used when there are no samples.
    pub peer_error_ratio: f64,
    /// Mean participation ratio, if any rounds were recorded.
    pub consensus_efficiency: Option<f64>,
    /// Throughput scoring full performance.
    pub expected_throughput: f64,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Component scores, each clamped to 0-100.
pub fn health_components(inputs: &HealthInputs<'_>) -> HealthComponents {
    let connectivity = if inputs.total == 0 {
        100.0
    } else {
        inputs.connected as f64 / inputs.total as f64 * 100.0
    };

    let performance = match (
        mean(inputs.recent.iter().map(|s| s.latency_ms)),
        mean(inputs.recent.iter().map(|s| s.throughput)),
    ) {
        (Some(latency), Some(throughput)) => {
            let tp = (throughput / inputs.expected_throughput * 100.0).min(100.0);
            0.5 * latency_score(latency) + 0.5 * tp
        }
        _ => latency_score(inputs.peer_latency_ms),
    };

    let loss = mean(inputs.recent.iter().map(|s| s.packet_loss)).unwrap_or(inputs.peer_error_ratio);
    let reliability = 100.0 * (1.0 - loss);

    let consensus = inputs.consensus_efficiency.map_or(100.0, |e| e * 100.0);

    HealthComponents {
        connectivity: connectivity.clamp(0.0, 100.0),
        performance: performance.clamp(0.0, 100.0),
        reliability: reliability.clamp(0.0, 100.0),
        consensus: consensus.clamp(0.0, 100.0),
    }
}

/// Weighted sum of the components.
pub fn health_score(c: &HealthComponents) -> f64 {
    CONNECTIVITY_WEIGHT * c.connectivity
        + PERFORMANCE_WEIGHT * c.performance
        + RELIABILITY_WEIGHT * c.reliability
        + CONSENSUS_WEIGHT * c.consensus
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Timestamp;

    fn sample(latency_ms: f64, packet_loss: f64, throughput: f64) -> MetricsSample {
        MetricsSample {
            timestamp: Timestamp::new(0),
            latency_ms,
            packet_loss,
            throughput,
        }
    }

    fn inputs(recent: &[MetricsSample]) -> HealthInputs<'_> {
        HealthInputs {
            connected: 3,
            total: 3,
            recent,
            peer_latency_ms: 0.0,
            peer_error_ratio: 0.0,
            consensus_efficiency: None,
            expected_throughput: 10.0,
        }
    }

    #[test]
    fn test_perfect_network_scores_100() {
        let samples = [sample(0.0, 0.0, 10.0)];
        let c = health_components(&inputs(&samples));
        assert!((health_score(&c) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_weights() {
        let samples = [sample(1_000.0, 0.5, 0.0)];
        let mut i = inputs(&samples);
        i.connected = 1;
        i.total = 2;
        i.consensus_efficiency = Some(0.25);
        let c = health_components(&i);
        assert_eq!(c.connectivity, 50.0);
        assert_eq!(c.performance, 0.0);
        assert_eq!(c.reliability, 50.0);
        assert_eq!(c.consensus, 25.0);
        assert!((health_score(&c) - (15.0 + 0.0 + 10.0 + 5.0)).abs() < 1e-9);
    }

    #[test]
    fn test_falls_back_to_peer_table() {
        let mut i = inputs(&[]);
        i.peer_latency_ms = 200.0;
        i.peer_error_ratio = 0.1;
        let c = health_components(&i);
        assert_eq!(c.performance, 80.0);
        assert!((c.reliability - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_table_is_fully_connected() {
        let mut i = inputs(&[]);
        i.connected = 0;
        i.total = 0;
        assert_eq!(health_components(&i).connectivity, 100.0);
    }
}

//! Per-source counters collected between security scans.

use nb_01_network_monitor::{NetworkTopology, ValidatorPeer};
use nb_02_security_manager::{NetworkSecuritySnapshot, SourceCounters};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Counters by source since the last drain.
#[derive(Debug, Default)]
pub struct SourceCounterBook {
    counters: Mutex<BTreeMap<String, SourceCounters>>,
}

impl SourceCounterBook {
    /// Empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// One request or message received from `source`.
    pub fn record_request(&self, source: &str) {
        self.update(source, |c| c.requests += 1);
    }

    /// One failed authentication by `source`.
    pub fn record_failed_auth(&self, source: &str) {
        self.update(source, |c| c.failed_auth += 1);
    }

    /// One attempt by `source` to act without authorization.
    pub fn record_unauthorized(&self, source: &str) {
        self.update(source, |c| c.unauthorized += 1);
    }

    /// Take every counter, sorted by source, and start a new window.
    pub fn drain(&self) -> Vec<SourceCounters> {
        std::mem::take(&mut *self.counters.lock())
            .into_values()
            .collect()
    }

    fn update(&self, source: &str, f: impl FnOnce(&mut SourceCounters)) {
        let mut counters = self.counters.lock();
        let entry = counters
            .entry(source.to_string())
            .or_insert_with(|| SourceCounters {
                source: source.to_string(),
                ..SourceCounters::default()
            });
        f(entry);
    }
}

/// Build the security manager's input from drained counters and the
/// monitor's view of the network.
pub fn security_snapshot(
    sources: Vec<SourceCounters>,
    topology: &NetworkTopology,
    peers: &[ValidatorPeer],
) -> NetworkSecuritySnapshot {
    NetworkSecuritySnapshot {
        sources,
        partition_detected: topology.partition_detected,
        connected_peers: peers
            .iter()
            .filter(|p| p.is_connected)
            .map(|p| p.address.clone())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Timestamp;

    #[test]
    fn test_counters_accumulate_and_drain() {
        let book = SourceCounterBook::new();
        book.record_request("b");
        book.record_request("a");
        book.record_failed_auth("a");
        book.record_unauthorized("c");

        let drained = book.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[0].source, "a");
        assert_eq!(drained[0].requests, 1);
        assert_eq!(drained[0].failed_auth, 1);
        assert_eq!(drained[2].unauthorized, 1);

        assert!(book.drain().is_empty());
    }

    #[test]
    fn test_snapshot_lists_connected_addresses() {
        let mut up = ValidatorPeer::new("v1", "10.0.0.1:7400", [1; 32]);
        up.mark_connected(Timestamp::new(10));
        let down = ValidatorPeer::new("v2", "10.0.1.1:7400", [2; 32]);
        let topology = NetworkTopology {
            total_validators: 2,
            connected_validators: 1,
            average_latency_ms: 0.0,
            partition_detected: true,
            consensus_efficiency: 1.0,
            health_score: 40.0,
        };

        let snapshot = security_snapshot(Vec::new(), &topology, &[up, down]);
        assert!(snapshot.partition_detected);
        assert_eq!(snapshot.connected_peers, vec!["10.0.0.1:7400".to_string()]);
    }
}

//! # NB-01 Peer Network Monitor
//!
//! Tracks the liveness and quality of links to the other bridge validators,
//! detects partitions and keeps the network alert log.
//!
//! **Subsystem ID:** 1
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Connection Lifecycle
//!
//! `add_peer` spawns one task per peer. The task dials through the
//! `PeerTransport` port, heartbeats every 30 s and writes the round-trip to
//! the peer's `latency_ms`. A response later than 5 s counts as one peer
//! error. When the link drops the task redials up to 5 times, 5 s apart,
//! then raises `validator_offline` and stops. `remove_peer` and `shutdown`
//! cancel the task through a watch channel.
//!
//! ## Partition Rule
//!
//! `connected * den < total * num` with a configurable quorum (default
//! 2/3). Exactly 2/3 connected is not a partition, and neither is an empty
//! peer table.
//!
//! ## Health Score
//!
//! | Component | Weight | Input |
//! |-----------|--------|-------|
//! | Connectivity | 30 % | connected share |
//! | Performance | 30 % | latency and throughput of recent samples |
//! | Reliability | 20 % | inverse packet loss |
//! | Consensus | 20 % | participation over recent rounds |
//!
//! ## Module Structure
//!
//! ```text
//! nb-01-network-monitor/
//! ├── domain/       # Peers, alerts, config, wire protocol, errors
//! ├── algorithms/   # Connection quality, partition rule, health score
//! ├── ports/        # NetworkMonitorApi, PeerTransport, MetricsSource
//! ├── adapters/     # TCP and in-memory transports, peer-table metrics
//! └── service       # NetworkMonitor and per-peer connection tasks
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{
    MemoryLink, MemoryTransport, PeerTableMetrics, TcpLink, TcpPeerListener, TcpTransport,
};
pub use algorithms::{connection_quality, health_score, partition_detected};
pub use domain::{
    decode_line, encode_line, AlertLog, AlertType, HealthComponents, HealthStatus, MetricsSample,
    MonitorConfig, MonitorError, NetworkAlert, NetworkHealth, NetworkTopology, Quorum,
    TransportError, ValidatorPeer, WireMessage,
};
pub use ports::{MetricsSource, NetworkMonitorApi, PeerLink, PeerTransport};
pub use service::{NetworkMonitor, MONITOR_SOURCE, NETWORK_SOURCE};

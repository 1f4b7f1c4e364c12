//! # Integration Tests
//!
//! Flows that cross subsystem boundaries, run on `BridgeCluster`s.

pub mod bridge_flows;
pub mod security_flows;

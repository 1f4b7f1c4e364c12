//! # Outbound Ports
//!
//! What the monitor needs from the outside world: a way to reach peers and a
//! source of metric samples.

use crate::domain::{MetricsSample, MonitorError, TransportError, ValidatorPeer, WireMessage};
use async_trait::async_trait;
use shared_types::Timestamp;

/// A duplex link to one peer.
#[async_trait]
pub trait PeerLink: Send {
    /// Write one message.
    async fn send(&mut self, message: &WireMessage) -> Result<(), TransportError>;

    /// Read the next message. `Ok(None)` once the peer closed the link.
    ///
    /// Must be cancel-safe: the monitor races it against timers.
    async fn recv(&mut self) -> Result<Option<WireMessage>, TransportError>;
}

/// Dials peers.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Open a link to `address`.
    async fn connect(&self, address: &str) -> Result<Box<dyn PeerLink>, TransportError>;
}

/// Produces periodic metric samples.
pub trait MetricsSource: Send + Sync {
    /// Sample the network given the current peer table.
    fn sample(&self, peers: &[ValidatorPeer], now: Timestamp)
        -> Result<MetricsSample, MonitorError>;
}

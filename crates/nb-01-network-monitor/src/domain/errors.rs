//! # Error Types

use thiserror::Error;
use uuid::Uuid;

/// Peer link failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Dial failed.
    #[error("Connect to {address} failed: {reason}")]
    Connect {
        /// Dialed address.
        address: String,
        /// Underlying cause.
        reason: String,
    },

    /// The peer closed the link.
    #[error("Link closed")]
    Closed,

    /// Read or write failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// A line that is not a wire message.
    #[error("Malformed message: {0}")]
    Malformed(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e.to_string())
    }
}

/// Network monitor errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// A peer with this id is already registered.
    #[error("Peer already registered: {0}")]
    PeerExists(String),

    /// No peer with this id.
    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    /// No alert with this id.
    #[error("Alert not found: {0}")]
    AlertNotFound(Uuid),

    /// Metric collection failed.
    #[error("Metric collection failed: {0}")]
    Collection(String),

    /// The monitor was shut down.
    #[error("Monitor is shut down")]
    ShutDown,

    /// Link failure.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

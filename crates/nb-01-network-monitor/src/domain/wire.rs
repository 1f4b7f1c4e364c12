//! # Peer Wire Protocol
//!
//! Newline-delimited JSON objects tagged by `type`. Every message carries a
//! `timestamp`. Unknown types decode to [`WireMessage::Unknown`] and are
//! ignored; lines that are not JSON objects are malformed.

use super::alerts::AlertType;
use super::entities::MetricsSample;
use super::errors::TransportError;
use serde::{Deserialize, Serialize};
use shared_types::{Severity, Timestamp};

/// A message on a peer link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    /// Liveness probe.
    Heartbeat {
        /// Send time.
        timestamp: Timestamp,
        /// Echoed back in the response.
        nonce: u64,
    },
    /// Answer to a heartbeat.
    HeartbeatResponse {
        /// Send time.
        timestamp: Timestamp,
        /// Nonce of the probe being answered.
        nonce: u64,
    },
    /// The sender's own metrics.
    Metrics {
        /// Send time.
        timestamp: Timestamp,
        /// Sample.
        sample: MetricsSample,
    },
    /// An alert raised by the sender.
    Alert {
        /// Send time.
        timestamp: Timestamp,
        /// Kind.
        alert_type: AlertType,
        /// Severity.
        severity: Severity,
        /// Description.
        message: String,
    },
    /// A type this node does not know.
    #[serde(other)]
    Unknown,
}

/// Encode as one line, trailing newline included.
pub fn encode_line(message: &WireMessage) -> Result<String, TransportError> {
    let mut line =
        serde_json::to_string(message).map_err(|e| TransportError::Malformed(e.to_string()))?;
    line.push('\n');
    Ok(line)
}

/// Decode one line. Surrounding whitespace is ignored.
pub fn decode_line(line: &str) -> Result<WireMessage, TransportError> {
    serde_json::from_str(line.trim()).map_err(|e| TransportError::Malformed(e.to_string()))
}

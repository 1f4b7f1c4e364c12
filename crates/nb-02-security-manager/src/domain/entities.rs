//! # Domain Entities
//!
//! Inputs and verdicts of the security checks, tokens, events and
//! notifications.

use super::threats::{SecurityThreat, ThreatType};
use serde::{Deserialize, Serialize};
use shared_types::{Severity, Timestamp, ValidatorId};
use uuid::Uuid;

// =============================================================================
// TRANSACTION & VALIDATOR CHECKS
// =============================================================================

/// A bridge transaction submitted for screening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Submitting peer id or address.
    pub source: String,
    /// Amount in base units.
    pub amount: u64,
    /// Raw payload (memo, calldata).
    pub payload: Vec<u8>,
}

/// Outcome of `validate_transaction_security`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionAssessment {
    /// Whether the transaction may be signed.
    pub valid: bool,
    /// Score after deductions, starting from 100.
    pub score: i32,
    /// Human-readable deductions.
    pub findings: Vec<String>,
    /// Ids of threats raised by this check.
    pub threats: Vec<Uuid>,
}

/// A validator's signed statement to check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorAttestation {
    /// Claimed signer.
    pub validator_id: ValidatorId,
    /// Exact signed bytes.
    pub message: Vec<u8>,
    /// Ed25519 signature.
    pub signature: [u8; 64],
}

/// Outcome of `validate_validator_security`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorAssessment {
    /// Whether the validator's signature may count.
    pub accepted: bool,
    /// Kinds raised, in check order.
    pub raised: Vec<ThreatType>,
}

// =============================================================================
// NETWORK SNAPSHOT
// =============================================================================

/// Per-source counters over one observation window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounters {
    /// Peer id or address.
    pub source: String,
    /// Failed authentications.
    pub failed_auth: u64,
    /// Requests received.
    pub requests: u64,
    /// Unauthorized access attempts.
    pub unauthorized: u64,
}

/// Input of `monitor_network_security`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSecuritySnapshot {
    /// Counters by source.
    pub sources: Vec<SourceCounters>,
    /// Partition flag from the network monitor.
    pub partition_detected: bool,
    /// Addresses of currently connected peers.
    pub connected_peers: Vec<String>,
}

// =============================================================================
// TOKENS
// =============================================================================

/// Signed content of a secure token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// What the token authorizes.
    pub purpose: String,
    /// Issue time.
    pub timestamp: Timestamp,
    /// Random hex nonce.
    pub nonce: String,
    /// Last valid second.
    pub expiry: Timestamp,
}

// =============================================================================
// EVENTS & NOTIFICATIONS
// =============================================================================

/// Security events fanned out to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SecurityEvent {
    /// A threat was recorded.
    ThreatDetected(SecurityThreat),
    /// A source was quarantined.
    SourceQuarantined {
        /// Quarantined source.
        source: String,
        /// Quarantine end.
        until: Timestamp,
    },
    /// Keys rotated.
    KeysRotated {
        /// New generation.
        generation: u64,
    },
    /// Lockdown latched.
    LockdownActivated {
        /// Trigger.
        reason: String,
    },
    /// Lockdown cleared by an operator.
    LockdownCleared,
}

/// Message to emergency contacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Urgency.
    pub severity: Severity,
    /// One-line summary.
    pub title: String,
    /// Detail text.
    pub body: String,
    /// Recipients.
    pub recipients: Vec<String>,
    /// Creation time.
    pub timestamp: Timestamp,
}

/// State of the emergency lockdown latch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockdownState {
    /// Why it was triggered.
    pub reason: String,
    /// When.
    pub since: Timestamp,
    /// Sources quarantined by the lockdown.
    pub quarantined: Vec<String>,
}

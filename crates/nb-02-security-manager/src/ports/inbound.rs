//! # Inbound Ports
//!
//! API trait defining what the security manager can do.

use crate::domain::{
    LockdownState, NetworkSecuritySnapshot, SecurityError, SecurityEvent, SecurityThreat,
    ThreatType, TokenError, TokenPayload, TransactionAssessment, TransactionRequest,
    ValidatorAssessment, ValidatorAttestation,
};
use async_trait::async_trait;
use shared_types::Severity;
use tokio::sync::broadcast;

/// Security manager API - inbound port.
#[async_trait]
pub trait SecurityManagerApi: Send + Sync {
    /// Record a threat, escalate it to its severity floor, and apply the
    /// automatic mitigation for its kind.
    async fn detect_threat(
        &self,
        threat_type: ThreatType,
        severity: Severity,
        source: &str,
        details: serde_json::Value,
    ) -> SecurityThreat;

    /// Score a transaction. Quarantined sources are rejected outright.
    async fn validate_transaction_security(
        &self,
        request: &TransactionRequest,
    ) -> TransactionAssessment;

    /// Check a validator's signature, reputation and Sybil risk.
    async fn validate_validator_security(
        &self,
        attestation: &ValidatorAttestation,
    ) -> ValidatorAssessment;

    /// Turn network counters and topology into threats.
    async fn monitor_network_security(
        &self,
        snapshot: &NetworkSecuritySnapshot,
    ) -> Vec<SecurityThreat>;

    /// Issue a token for `purpose`, valid for `ttl_secs` or the configured default.
    async fn generate_secure_token(
        &self,
        purpose: &str,
        ttl_secs: Option<u64>,
    ) -> Result<String, SecurityError>;

    /// Validate a token against the current token key.
    async fn validate_secure_token(
        &self,
        token: &str,
        expected_purpose: &str,
    ) -> Result<TokenPayload, TokenError>;

    /// Seal data under the current primary key.
    async fn encrypt_sensitive_data(&self, plaintext: &[u8]) -> Result<Vec<u8>, SecurityError>;

    /// Open data sealed by `encrypt_sensitive_data`.
    async fn decrypt_sensitive_data(&self, sealed: &[u8]) -> Result<Vec<u8>, SecurityError>;

    /// Latch the emergency lockdown.
    async fn trigger_emergency_lockdown(&self, reason: &str) -> LockdownState;

    /// Release the lockdown latch. Returns whether it was set.
    async fn clear_emergency_lockdown(&self) -> bool;

    /// Replace both keys. Returns the new generation.
    async fn rotate_keys(&self) -> u64;

    /// Whether `source` is currently quarantined.
    async fn is_quarantined(&self, source: &str) -> bool;

    /// Recorded threats, oldest first.
    async fn threats(&self) -> Vec<SecurityThreat>;

    /// Drop mitigated threats past retention. Returns how many were removed.
    async fn gc_threats(&self) -> usize;

    /// Current lockdown, if latched.
    async fn lockdown(&self) -> Option<LockdownState>;

    /// Subscribe to security events.
    fn subscribe(&self) -> broadcast::Receiver<SecurityEvent>;
}

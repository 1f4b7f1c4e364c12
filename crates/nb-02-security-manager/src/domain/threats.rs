//! # Threat Model
//!
//! Threat taxonomy, severity floors and the threat record.

use serde::{Deserialize, Serialize};
use shared_types::{Severity, Timestamp};
use std::fmt;
use uuid::Uuid;

/// Classified threat kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatType {
    /// Repeated authentication failures.
    BruteForce,
    /// Request flood.
    Ddos,
    /// Probe or intrusion attempt.
    IntrusionAttempt,
    /// Transaction with a malicious payload.
    MaliciousTransaction,
    /// Attack on bridge consensus.
    ConsensusAttack,
    /// Many identities controlled by one party.
    SybilAttack,
    /// Node isolated behind attacker-controlled peers.
    EclipseAttack,
    /// Stored data failed its integrity check.
    DataCorruption,
    /// Access without authorization.
    UnauthorizedAccess,
    /// Signature or key failure.
    CryptoVulnerability,
    /// Unexplained network behavior.
    NetworkAnomaly,
    /// Validator behaving as if compromised.
    ValidatorCompromise,
}

impl ThreatType {
    /// All kinds, for metrics and iteration.
    pub const ALL: [ThreatType; 12] = [
        ThreatType::BruteForce,
        ThreatType::Ddos,
        ThreatType::IntrusionAttempt,
        ThreatType::MaliciousTransaction,
        ThreatType::ConsensusAttack,
        ThreatType::SybilAttack,
        ThreatType::EclipseAttack,
        ThreatType::DataCorruption,
        ThreatType::UnauthorizedAccess,
        ThreatType::CryptoVulnerability,
        ThreatType::NetworkAnomaly,
        ThreatType::ValidatorCompromise,
    ];

    /// Lowest severity this kind may be recorded with.
    pub fn severity_floor(&self) -> Severity {
        match self {
            ThreatType::ConsensusAttack
            | ThreatType::ValidatorCompromise
            | ThreatType::CryptoVulnerability
            | ThreatType::DataCorruption => Severity::Critical,
            ThreatType::SybilAttack | ThreatType::EclipseAttack | ThreatType::Ddos => {
                Severity::High
            }
            ThreatType::MaliciousTransaction
            | ThreatType::IntrusionAttempt
            | ThreatType::BruteForce
            | ThreatType::UnauthorizedAccess => Severity::Medium,
            ThreatType::NetworkAnomaly => Severity::Low,
        }
    }

    /// Whether the source is quarantined automatically.
    pub fn auto_quarantine(&self) -> bool {
        matches!(
            self,
            ThreatType::BruteForce | ThreatType::Ddos | ThreatType::UnauthorizedAccess
        )
    }

    /// Stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatType::BruteForce => "brute_force",
            ThreatType::Ddos => "ddos",
            ThreatType::IntrusionAttempt => "intrusion_attempt",
            ThreatType::MaliciousTransaction => "malicious_transaction",
            ThreatType::ConsensusAttack => "consensus_attack",
            ThreatType::SybilAttack => "sybil_attack",
            ThreatType::EclipseAttack => "eclipse_attack",
            ThreatType::DataCorruption => "data_corruption",
            ThreatType::UnauthorizedAccess => "unauthorized_access",
            ThreatType::CryptoVulnerability => "crypto_vulnerability",
            ThreatType::NetworkAnomaly => "network_anomaly",
            ThreatType::ValidatorCompromise => "validator_compromise",
        }
    }
}

impl fmt::Display for ThreatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded mitigation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MitigationAction {
    /// Source quarantined until the given time.
    Quarantined {
        /// Quarantine end.
        until: Timestamp,
    },
    /// Reputation lowered.
    ReputationPenalized {
        /// New score.
        score_millis: u32,
    },
    /// Emergency lockdown triggered by this threat.
    LockdownTriggered,
}

/// A detected threat.
///
/// Once `mitigated` is set only `actions` may grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityThreat {
    /// Unique id.
    pub id: Uuid,
    /// Kind.
    pub threat_type: ThreatType,
    /// Effective severity, never below the kind's floor.
    pub severity: Severity,
    /// Peer id or address the threat is attributed to.
    pub source: String,
    /// Detection time.
    pub timestamp: Timestamp,
    /// Free-form evidence.
    pub details: serde_json::Value,
    /// Whether an automatic mitigation was applied.
    pub mitigated: bool,
    /// Mitigation log, append-only.
    pub actions: Vec<(Timestamp, MitigationAction)>,
}

impl SecurityThreat {
    /// New unmitigated threat with severity raised to the kind's floor.
    pub fn new(
        threat_type: ThreatType,
        requested: Severity,
        source: impl Into<String>,
        details: serde_json::Value,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            threat_type,
            severity: requested.max(threat_type.severity_floor()),
            source: source.into(),
            timestamp,
            details,
            mitigated: false,
            actions: Vec::new(),
        }
    }

    /// Append a mitigation step and mark the threat mitigated.
    pub fn record_mitigation(&mut self, at: Timestamp, action: MitigationAction) {
        self.actions.push((at, action));
        self.mitigated = true;
    }

    /// Append an action without changing the mitigated flag.
    pub fn record_action(&mut self, at: Timestamp, action: MitigationAction) {
        self.actions.push((at, action));
    }
}

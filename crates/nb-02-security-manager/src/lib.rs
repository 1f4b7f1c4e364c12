//! # NB-02 Security Manager
//!
//! Threat classification and mitigation for a bridge validator node.
//!
//! **Subsystem ID:** 2
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Responsibilities
//!
//! - Record threats with severity escalated to the kind's floor
//! - Quarantine sources of brute-force, DDoS and unauthorized access
//! - Score transactions and validator attestations before they are signed
//! - Issue and validate HMAC-authenticated tokens
//! - Seal sensitive data under generation-tagged keys
//! - Latch an emergency lockdown on critical threats
//!
//! ## Lockdown
//!
//! Lockdown rotates both keys, revokes every issued session, quarantines the
//! sources of threats seen within the lookback window and notifies the
//! emergency contacts. It stays latched until `clear_emergency_lockdown`.
//!
//! ## Module Structure
//!
//! ```text
//! nb-02-security-manager/
//! ├── domain/       # Threats, config, key ring, entities, errors
//! ├── algorithms/   # Tokens, scoring, rolling stats, subnets
//! ├── ports/        # SecurityManagerApi, estimator and notification traits
//! ├── adapters/     # Reputation book, z-score detector, Sybil estimator, sinks
//! └── service       # SecurityManager
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
    ChannelNotificationSink, LogNotificationSink, PatternInspector, ReputationBook,
    SubnetSybilEstimator, ZScoreAnomalyDetector,
};
pub use algorithms::{decode_token, encode_token, subnet_of};
pub use domain::{
    KeyRing, LockdownState, MitigationAction, NetworkSecuritySnapshot, Notification,
    SecurityConfig, SecurityError, SecurityEvent, SecurityLevel, SecurityThreat, SourceCounters,
    ThreatType, TokenError, TokenPayload, TransactionAssessment, TransactionRequest,
    ValidatorAssessment, ValidatorAttestation,
};
pub use ports::{
    AnomalyDetector, NotificationSink, PayloadInspector, ReputationSource, SecurityManagerApi,
    SybilEstimator,
};
pub use service::{SecurityDependencies, SecurityManager};

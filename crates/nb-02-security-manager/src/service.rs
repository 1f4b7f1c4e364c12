//! # Security Manager Service
//!
//! Implements `SecurityManagerApi`.
//!
//! ## Mitigation Flow
//!
//! ```text
//! detect_threat ──→ escalate to floor ──→ record ──→ publish
//!                                           │
//!          brute_force / ddos / unauthorized └──→ quarantine source
//!                      critical + auto_lockdown └──→ emergency lockdown
//! ```
//!
//! Threat records are append-only. Lockdown latches until an operator calls
//! `clear_emergency_lockdown`.

use crate::adapters::{
    LogNotificationSink, PatternInspector, ReputationBook, SubnetSybilEstimator,
    ZScoreAnomalyDetector,
};
use crate::algorithms::scoring::{
    ANOMALY_PENALTY, LOW_REPUTATION_PENALTY, MALICIOUS_PAYLOAD_PENALTY, RATE_LIMIT_PENALTY,
};
use crate::algorithms::{decode_token, encode_token, subnet_of, ScoreCard};
use crate::domain::{
    KeyRing, LockdownState, MitigationAction, NetworkSecuritySnapshot, Notification,
    SecurityConfig, SecurityError, SecurityEvent, SecurityThreat, ThreatType, TokenError,
    TokenPayload, TransactionAssessment, TransactionRequest, ValidatorAssessment,
    ValidatorAttestation,
};
use crate::ports::{
    AnomalyDetector, NotificationSink, PayloadInspector, ReputationSource, SecurityManagerApi,
    SybilEstimator,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use rand::RngCore;
use serde_json::json;
use shared_crypto::verify_signature;
use shared_types::{RateLimiter, Severity, SharedTimeSource, SystemTimeSource, Timestamp};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Pluggable collaborators of the security manager.
pub struct SecurityDependencies {
    /// Reputation scores.
    pub reputation: Arc<dyn ReputationSource>,
    /// Amount anomaly detection.
    pub anomaly: Arc<dyn AnomalyDetector>,
    /// Sybil risk.
    pub sybil: Arc<dyn SybilEstimator>,
    /// Payload patterns.
    pub inspector: Arc<dyn PayloadInspector>,
    /// Emergency contact delivery.
    pub notifier: Arc<dyn NotificationSink>,
    /// Clock.
    pub time: SharedTimeSource,
}

impl SecurityDependencies {
    /// Shipped implementations on the system clock.
    pub fn standard(config: &SecurityConfig) -> Self {
        Self {
            reputation: Arc::new(ReputationBook::new(config.default_reputation)),
            anomaly: Arc::new(ZScoreAnomalyDetector::default()),
            sybil: Arc::new(SubnetSybilEstimator::new()),
            inspector: Arc::new(PatternInspector::default()),
            notifier: Arc::new(LogNotificationSink),
            time: Arc::new(SystemTimeSource::new()),
        }
    }
}

/// The security manager.
pub struct SecurityManager {
    config: SecurityConfig,
    deps: SecurityDependencies,
    keys: RwLock<KeyRing>,
    threats: RwLock<Vec<SecurityThreat>>,
    quarantine: RwLock<HashMap<String, Timestamp>>,
    sessions: RwLock<HashMap<String, Timestamp>>,
    lockdown: RwLock<Option<LockdownState>>,
    rate_limiter: RateLimiter,
    events: broadcast::Sender<SecurityEvent>,
}

impl SecurityManager {
    /// Manager with fresh random keys.
    pub fn new(config: SecurityConfig, deps: SecurityDependencies) -> Self {
        let keys = KeyRing::generate(deps.time.now());
        Self::with_key_ring(config, deps, keys)
    }

    /// Manager over an existing key ring.
    pub fn with_key_ring(config: SecurityConfig, deps: SecurityDependencies, keys: KeyRing) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let rate_limiter = RateLimiter::new(config.rate_limit_burst, config.rate_limit_per_sec);
        Self {
            config,
            deps,
            keys: RwLock::new(keys),
            threats: RwLock::new(Vec::new()),
            quarantine: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            lockdown: RwLock::new(None),
            rate_limiter,
            events,
        }
    }

    /// Configuration.
    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Current key generation.
    pub fn key_generation(&self) -> u64 {
        self.keys.read().generation()
    }

    /// Whether lockdown is latched.
    pub fn is_lockdown_active(&self) -> bool {
        self.lockdown.read().is_some()
    }

    /// Unexpired issued token sessions.
    pub fn active_sessions(&self) -> usize {
        let now = self.now();
        self.sessions
            .read()
            .values()
            .filter(|expiry| **expiry >= now)
            .count()
    }

    /// Rotate keys if the level's period elapsed. Returns whether it rotated.
    pub fn rotate_keys_if_due(&self) -> bool {
        let now = self.now();
        let due = self
            .keys
            .read()
            .rotation_due(now, self.config.level.rotation_period_secs());
        if due {
            self.rotate_now(now);
        }
        due
    }

    /// Drop expired quarantines and rate-limit buckets.
    pub fn gc_quarantine(&self) -> usize {
        let now = self.now();
        let mut quarantine = self.quarantine.write();
        let before = quarantine.len();
        quarantine.retain(|_, until| *until > now);
        self.rate_limiter.gc_full(now);
        self.sessions.write().retain(|_, expiry| *expiry >= now);
        before - quarantine.len()
    }

    fn now(&self) -> Timestamp {
        self.deps.time.now()
    }

    fn publish(&self, event: SecurityEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn quarantine_source(&self, source: &str, now: Timestamp) -> Timestamp {
        let until = now.add_secs(self.config.quarantine_secs);
        self.quarantine
            .write()
            .entry(source.to_string())
            .and_modify(|t| *t = (*t).max(until))
            .or_insert(until);
        warn!("[nb-02] Source {} quarantined until {}", source, until);
        self.publish(SecurityEvent::SourceQuarantined {
            source: source.to_string(),
            until,
        });
        until
    }

    fn rotate_now(&self, now: Timestamp) -> u64 {
        let generation = {
            let mut keys = self.keys.write();
            keys.rotate(now);
            keys.generation()
        };
        info!("[nb-02] Keys rotated to generation {}", generation);
        self.publish(SecurityEvent::KeysRotated { generation });
        generation
    }

    fn record_threat(
        &self,
        threat_type: ThreatType,
        severity: Severity,
        source: &str,
        details: serde_json::Value,
    ) -> SecurityThreat {
        let now = self.now();
        let mut threat = SecurityThreat::new(threat_type, severity, source, details, now);

        if threat_type.auto_quarantine() {
            let until = self.quarantine_source(source, now);
            threat.record_mitigation(now, MitigationAction::Quarantined { until });
        }
        let score = self.deps.reputation.penalize(source, threat_type);
        threat.record_action(
            now,
            MitigationAction::ReputationPenalized {
                score_millis: (score * 1_000.0).round() as u32,
            },
        );

        let lockdown = threat.severity == Severity::Critical
            && self.config.auto_lockdown_on_critical
            && !self.is_lockdown_active();
        if lockdown {
            threat.record_action(now, MitigationAction::LockdownTriggered);
        }

        match threat.severity {
            Severity::Critical | Severity::High => error!(
                "[nb-02] Threat {} ({}) from {}: {}",
                threat.threat_type, threat.severity, source, threat.id
            ),
            _ => warn!(
                "[nb-02] Threat {} ({}) from {}: {}",
                threat.threat_type, threat.severity, source, threat.id
            ),
        }

        self.threats.write().push(threat.clone());
        self.publish(SecurityEvent::ThreatDetected(threat.clone()));

        if lockdown {
            self.lockdown_now(&format!("critical threat {} from {}", threat_type, source));
        }
        threat
    }

    fn lockdown_now(&self, reason: &str) -> LockdownState {
        let now = self.now();
        let lookback = now
            .as_secs()
            .saturating_sub(self.config.lockdown_lookback_secs);

        self.rotate_now(now);
        let revoked = {
            let mut sessions = self.sessions.write();
            let n = sessions.len();
            sessions.clear();
            n
        };

        let recent: HashSet<String> = self
            .threats
            .read()
            .iter()
            .filter(|t| t.timestamp.as_secs() >= lookback)
            .map(|t| t.source.clone())
            .collect();
        let mut quarantined: Vec<String> = recent.into_iter().collect();
        quarantined.sort();
        for source in &quarantined {
            self.quarantine_source(source, now);
        }

        let state = LockdownState {
            reason: reason.to_string(),
            since: now,
            quarantined: quarantined.clone(),
        };
        *self.lockdown.write() = Some(state.clone());

        error!(
            "[nb-02] EMERGENCY LOCKDOWN: {} ({} sessions revoked, {} sources quarantined)",
            reason,
            revoked,
            quarantined.len()
        );
        self.deps.notifier.notify(Notification {
            severity: Severity::Critical,
            title: "Emergency lockdown activated".to_string(),
            body: format!(
                "{reason}; quarantined: {}",
                if quarantined.is_empty() {
                    "none".to_string()
                } else {
                    quarantined.join(", ")
                }
            ),
            recipients: self.config.emergency_contacts.clone(),
            timestamp: now,
        });
        self.publish(SecurityEvent::LockdownActivated {
            reason: reason.to_string(),
        });
        state
    }
}

#[async_trait]
impl SecurityManagerApi for SecurityManager {
    async fn detect_threat(
        &self,
        threat_type: ThreatType,
        severity: Severity,
        source: &str,
        details: serde_json::Value,
    ) -> SecurityThreat {
        self.record_threat(threat_type, severity, source, details)
    }

    async fn validate_transaction_security(
        &self,
        request: &TransactionRequest,
    ) -> TransactionAssessment {
        let now = self.now();
        if self.is_quarantined(&request.source).await {
            debug!("[nb-02] Rejecting transaction from quarantined {}", request.source);
            return TransactionAssessment {
                valid: false,
                score: 0,
                findings: vec!["source quarantined".to_string()],
                threats: Vec::new(),
            };
        }

        let mut card = ScoreCard::new();
        let mut threats = Vec::new();

        if let Some(pattern) = self.deps.inspector.inspect(&request.payload) {
            card.deduct(MALICIOUS_PAYLOAD_PENALTY, format!("payload matches {pattern:?}"));
            let t = self.record_threat(
                ThreatType::MaliciousTransaction,
                Severity::Medium,
                &request.source,
                json!({ "pattern": pattern, "amount": request.amount }),
            );
            threats.push(t.id);
        }

        let reputation = self.deps.reputation.reputation(&request.source);
        if reputation < self.config.source_reputation_floor {
            card.deduct(LOW_REPUTATION_PENALTY, format!("source reputation {reputation:.2}"));
        }

        if self.deps.anomaly.observe(&request.source, request.amount) {
            card.deduct(ANOMALY_PENALTY, format!("anomalous amount {}", request.amount));
        }

        if !self.rate_limiter.try_acquire(&request.source, now) {
            card.deduct(RATE_LIMIT_PENALTY, "rate limit exceeded");
            let t = self.record_threat(
                ThreatType::Ddos,
                Severity::High,
                &request.source,
                json!({ "reason": "transaction rate limit" }),
            );
            threats.push(t.id);
        }

        let valid = card.passes(self.config.min_transaction_score) && threats.is_empty();
        let (score, findings) = card.into_parts();
        debug!(
            "[nb-02] Transaction from {} scored {} (valid: {})",
            request.source, score, valid
        );
        TransactionAssessment {
            valid,
            score,
            findings,
            threats,
        }
    }

    async fn validate_validator_security(
        &self,
        attestation: &ValidatorAttestation,
    ) -> ValidatorAssessment {
        let id = attestation.validator_id;
        let source = id.to_hex();
        let mut raised = Vec::new();

        if let Err(e) = verify_signature(id.as_bytes(), &attestation.message, &attestation.signature)
        {
            self.record_threat(
                ThreatType::CryptoVulnerability,
                Severity::Critical,
                &source,
                json!({ "error": e.to_string() }),
            );
            raised.push(ThreatType::CryptoVulnerability);
        }

        let reputation = self.deps.reputation.reputation(&source);
        if reputation < self.config.validator_reputation_floor {
            self.record_threat(
                ThreatType::ValidatorCompromise,
                Severity::Critical,
                &source,
                json!({ "reputation": reputation }),
            );
            raised.push(ThreatType::ValidatorCompromise);
        }

        let risk = self.deps.sybil.sybil_risk(&id);
        if risk > self.config.sybil_risk_limit {
            self.record_threat(
                ThreatType::SybilAttack,
                Severity::High,
                &source,
                json!({ "risk": risk }),
            );
            raised.push(ThreatType::SybilAttack);
        }

        ValidatorAssessment {
            accepted: raised.is_empty(),
            raised,
        }
    }

    async fn monitor_network_security(
        &self,
        snapshot: &NetworkSecuritySnapshot,
    ) -> Vec<SecurityThreat> {
        let mut raised = Vec::new();

        for counters in &snapshot.sources {
            if counters.failed_auth >= self.config.failed_auth_limit {
                raised.push(self.record_threat(
                    ThreatType::BruteForce,
                    Severity::Medium,
                    &counters.source,
                    json!({ "failed_auth": counters.failed_auth }),
                ));
            }
            if counters.requests >= self.config.request_limit {
                raised.push(self.record_threat(
                    ThreatType::Ddos,
                    Severity::High,
                    &counters.source,
                    json!({ "requests": counters.requests }),
                ));
            }
            if counters.unauthorized > 0 {
                raised.push(self.record_threat(
                    ThreatType::UnauthorizedAccess,
                    Severity::Medium,
                    &counters.source,
                    json!({ "attempts": counters.unauthorized }),
                ));
            }
        }

        if snapshot.partition_detected {
            raised.push(self.record_threat(
                ThreatType::NetworkAnomaly,
                Severity::Low,
                "network",
                json!({ "reason": "partition detected" }),
            ));
        }

        let parsed: Vec<String> = snapshot
            .connected_peers
            .iter()
            .filter_map(|a| subnet_of(a))
            .collect();
        let subnets: HashSet<&String> = parsed.iter().collect();
        if parsed.len() > 1 && parsed.len() == snapshot.connected_peers.len() && subnets.len() == 1
        {
            let subnet = parsed[0].clone();
            raised.push(self.record_threat(
                ThreatType::EclipseAttack,
                Severity::High,
                &subnet,
                json!({ "peers": snapshot.connected_peers.len(), "subnet": subnet }),
            ));
        }

        raised
    }

    async fn generate_secure_token(
        &self,
        purpose: &str,
        ttl_secs: Option<u64>,
    ) -> Result<String, SecurityError> {
        let now = self.now();
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);
        let payload = TokenPayload {
            purpose: purpose.to_string(),
            timestamp: now,
            nonce: hex::encode(nonce),
            expiry: now.add_secs(ttl_secs.unwrap_or(self.config.token_ttl_secs)),
        };
        let token = encode_token(&payload, self.keys.read().token_key())
            .map_err(|e| SecurityError::Serialization(e.to_string()))?;
        self.sessions.write().insert(payload.nonce, payload.expiry);
        Ok(token)
    }

    async fn validate_secure_token(
        &self,
        token: &str,
        expected_purpose: &str,
    ) -> Result<TokenPayload, TokenError> {
        let now = self.now();
        decode_token(token, self.keys.read().token_key(), expected_purpose, now)
    }

    async fn encrypt_sensitive_data(&self, plaintext: &[u8]) -> Result<Vec<u8>, SecurityError> {
        self.keys.read().seal(plaintext)
    }

    async fn decrypt_sensitive_data(&self, sealed: &[u8]) -> Result<Vec<u8>, SecurityError> {
        self.keys.read().open(sealed)
    }

    async fn trigger_emergency_lockdown(&self, reason: &str) -> LockdownState {
        self.lockdown_now(reason)
    }

    async fn clear_emergency_lockdown(&self) -> bool {
        let cleared = self.lockdown.write().take().is_some();
        if cleared {
            info!("[nb-02] Emergency lockdown cleared");
            self.publish(SecurityEvent::LockdownCleared);
        }
        cleared
    }

    async fn rotate_keys(&self) -> u64 {
        self.rotate_now(self.now())
    }

    async fn is_quarantined(&self, source: &str) -> bool {
        let now = self.now();
        self.quarantine
            .read()
            .get(source)
            .is_some_and(|until| *until > now)
    }

    async fn threats(&self) -> Vec<SecurityThreat> {
        self.threats.read().clone()
    }

    async fn gc_threats(&self) -> usize {
        let now = self.now();
        let retention = self.config.threat_retention_secs;
        let mut threats = self.threats.write();
        let before = threats.len();
        threats.retain(|t| !t.mitigated || now.secs_since(t.timestamp) < retention);
        let removed = before - threats.len();
        if removed > 0 {
            debug!("[nb-02] Garbage collected {} threats", removed);
        }
        removed
    }

    async fn lockdown(&self) -> Option<LockdownState> {
        self.lockdown.read().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<SecurityEvent> {
        self.events.subscribe()
    }
}

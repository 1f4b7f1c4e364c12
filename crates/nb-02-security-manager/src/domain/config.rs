//! # Security Configuration

use serde::{Deserialize, Serialize};

/// Operating security level. Sets the key rotation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    /// Rotate every 24 h.
    Standard,
    /// Rotate every 12 h.
    #[default]
    High,
    /// Rotate every 4 h.
    Maximum,
}

impl SecurityLevel {
    /// Key rotation period in seconds.
    pub fn rotation_period_secs(&self) -> u64 {
        match self {
            SecurityLevel::Standard => 24 * 3_600,
            SecurityLevel::High => 12 * 3_600,
            SecurityLevel::Maximum => 4 * 3_600,
        }
    }
}

/// Security manager configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Security level.
    pub level: SecurityLevel,
    /// Lock down automatically on any critical threat.
    pub auto_lockdown_on_critical: bool,
    /// Quarantine length for auto-mitigated sources.
    pub quarantine_secs: u64,
    /// Lockdown quarantines sources of threats newer than this.
    pub lockdown_lookback_secs: u64,
    /// Mitigated threats older than this are garbage collected.
    pub threat_retention_secs: u64,
    /// Minimum transaction score to accept.
    pub min_transaction_score: i32,
    /// Source reputation below this costs 20 points.
    pub source_reputation_floor: f64,
    /// Validator reputation below this raises `validator_compromise`.
    pub validator_reputation_floor: f64,
    /// Sybil risk above this raises `sybil_attack`.
    pub sybil_risk_limit: f64,
    /// Reputation of sources with no history.
    pub default_reputation: f64,
    /// Failed authentications per snapshot that count as brute force.
    pub failed_auth_limit: u64,
    /// Requests per snapshot that count as DDoS.
    pub request_limit: u64,
    /// Transaction submissions burst per source.
    pub rate_limit_burst: u64,
    /// Transaction submissions refill per second per source.
    pub rate_limit_per_sec: u64,
    /// Default token lifetime.
    pub token_ttl_secs: u64,
    /// Recipients of emergency notifications.
    pub emergency_contacts: Vec<String>,
    /// Broadcast channel capacity for security events.
    pub event_capacity: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            level: SecurityLevel::High,
            auto_lockdown_on_critical: true,
            quarantine_secs: 3_600,
            lockdown_lookback_secs: 3_600,
            threat_retention_secs: 7 * 24 * 3_600,
            min_transaction_score: 70,
            source_reputation_floor: 0.5,
            validator_reputation_floor: 0.8,
            sybil_risk_limit: 0.7,
            default_reputation: 1.0,
            failed_auth_limit: 5,
            request_limit: 1_000,
            rate_limit_burst: 20,
            rate_limit_per_sec: 2,
            token_ttl_secs: 3_600,
            emergency_contacts: Vec::new(),
            event_capacity: 256,
        }
    }
}

impl SecurityConfig {
    /// Config for tests: no automatic lockdown, small limits.
    pub fn for_testing() -> Self {
        Self {
            auto_lockdown_on_critical: false,
            failed_auth_limit: 3,
            request_limit: 100,
            rate_limit_burst: 5,
            rate_limit_per_sec: 1,
            emergency_contacts: vec!["ops@test".to_string()],
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_periods() {
        assert_eq!(SecurityLevel::Maximum.rotation_period_secs(), 14_400);
        assert_eq!(SecurityLevel::High.rotation_period_secs(), 43_200);
        assert_eq!(SecurityLevel::Standard.rotation_period_secs(), 86_400);
    }

    #[test]
    fn test_defaults() {
        let config = SecurityConfig::default();
        assert_eq!(config.min_transaction_score, 70);
        assert!(config.auto_lockdown_on_critical);
        assert_eq!(config.quarantine_secs, 3_600);
    }
}

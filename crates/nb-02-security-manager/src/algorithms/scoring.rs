//! Transaction risk scoring.

/// Starting score.
pub const BASE_SCORE: i32 = 100;
/// Deduction for a malicious payload pattern.
pub const MALICIOUS_PAYLOAD_PENALTY: i32 = 30;
/// Deduction for a low-reputation source.
pub const LOW_REPUTATION_PENALTY: i32 = 20;
/// Deduction for an anomalous amount.
pub const ANOMALY_PENALTY: i32 = 15;
/// Deduction for a rate-limit violation.
pub const RATE_LIMIT_PENALTY: i32 = 40;

/// Accumulates deductions and their reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreCard {
    score: i32,
    findings: Vec<String>,
}

impl Default for ScoreCard {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreCard {
    /// Card at `BASE_SCORE`.
    pub fn new() -> Self {
        Self {
            score: BASE_SCORE,
            findings: Vec::new(),
        }
    }

    /// Subtract `points` and record why.
    pub fn deduct(&mut self, points: i32, reason: impl Into<String>) {
        self.score -= points;
        self.findings.push(reason.into());
    }

    /// Current score.
    pub fn score(&self) -> i32 {
        self.score
    }

    /// Whether the score reaches `minimum`.
    pub fn passes(&self, minimum: i32) -> bool {
        self.score >= minimum
    }

    /// Consume into `(score, findings)`.
    pub fn into_parts(self) -> (i32, Vec<String>) {
        (self.score, self.findings)
    }
}

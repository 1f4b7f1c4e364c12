//! Connection quality and partition detection.

use crate::domain::Quorum;

/// `max(0, 100 - latency/10)`.
pub fn latency_score(latency_ms: f64) -> f64 {
    (100.0 - latency_ms / 10.0).max(0.0)
}

/// `max(0, 100 - 10 * errors)`.
pub fn error_score(errors: u64) -> f64 {
    (100.0 - 10.0 * errors as f64).max(0.0)
}

/// `0.4 * latency_score + 0.3 * error_score + 0.3 * (connected ? 100 : 0)`.
///
/// Diagnostic only. Never a substitute for security reputation.
pub fn connection_quality(latency_ms: u64, errors: u64, connected: bool) -> u8 {
    let link = if connected { 100.0 } else { 0.0 };
    let q = 0.4 * latency_score(latency_ms as f64) + 0.3 * error_score(errors) + 0.3 * link;
    q.round().clamp(0.0, 100.0) as u8
}

/// `connected / total < quorum`, in integers. An empty table is not a partition.
pub fn partition_detected(connected: usize, total: usize, quorum: Quorum) -> bool {
    if total == 0 {
        return false;
    }
    (connected as u128) * (quorum.den as u128) < (total as u128) * (quorum.num as u128)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_quality_formula() {
        assert_eq!(connection_quality(0, 0, true), 100);
        assert_eq!(connection_quality(0, 0, false), 70);
        assert_eq!(connection_quality(500, 3, true), 20 + 21 + 30);
        assert_eq!(connection_quality(5_000, 20, false), 0);
    }

    #[test]
    fn test_exactly_two_thirds_is_not_partition() {
        let q = Quorum::default();
        assert!(!partition_detected(2, 3, q));
        assert!(!partition_detected(10, 15, q));
        assert!(partition_detected(9, 15, q));
        assert!(partition_detected(1, 3, q));
    }

    #[test]
    fn test_empty_table_is_not_partition() {
        assert!(!partition_detected(0, 0, Quorum::default()));
    }

    #[test]
    fn test_custom_quorum() {
        let half = Quorum::new(1, 2);
        assert!(!partition_detected(2, 4, half));
        assert!(partition_detected(1, 4, half));
    }

    proptest! {
        #[test]
        fn partition_matches_rational(connected in 0usize..200, extra in 0usize..200) {
            let total = connected + extra;
            prop_assume!(total > 0);
            let q = Quorum::default();
            let expected = 3 * connected < 2 * total;
            prop_assert_eq!(partition_detected(connected, total, q), expected);
        }

        #[test]
        fn quality_is_bounded(latency in any::<u64>(), errors in any::<u64>(), up in any::<bool>()) {
            let q = connection_quality(latency, errors, up);
            prop_assert!(q <= 100);
        }
    }
}

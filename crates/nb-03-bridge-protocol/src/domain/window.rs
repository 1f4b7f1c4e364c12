//! # Rolling Volume Window
//!
//! Sliding window of finalized amounts. An entry recorded at `t` stops
//! counting at `t + window_secs`, so the limit applies to any 24 h span
//! rather than to calendar days.

use super::errors::ProgramError;
use shared_types::Timestamp;
use std::collections::VecDeque;

/// Sliding-window volume accumulator.
#[derive(Debug, Clone)]
pub struct RollingVolumeWindow {
    window_secs: u64,
    entries: VecDeque<(Timestamp, u64)>,
    peak: u64,
}

impl RollingVolumeWindow {
    /// Create an empty window.
    pub fn new(window_secs: u64) -> Self {
        Self {
            window_secs,
            entries: VecDeque::new(),
            peak: 0,
        }
    }

    /// Volume inside the window ending at `now`.
    pub fn volume(&self, now: Timestamp) -> u64 {
        self.entries
            .iter()
            .filter(|(at, _)| self.is_live(*at, now))
            .fold(0u64, |acc, (_, amount)| acc.saturating_add(*amount))
    }

    /// Highest window volume ever recorded.
    pub fn peak(&self) -> u64 {
        self.peak
    }

    /// Check that `amount` fits under `limit` without recording it.
    pub fn ensure_capacity(
        &self,
        now: Timestamp,
        amount: u64,
        limit: u64,
    ) -> Result<(), ProgramError> {
        let window_volume = self.volume(now);
        match window_volume.checked_add(amount) {
            Some(total) if total <= limit => Ok(()),
            _ => Err(ProgramError::DailyLimitExceeded {
                window_volume,
                amount,
                limit,
            }),
        }
    }

    /// Record a finalized amount and drop entries that left the window.
    pub fn record(&mut self, now: Timestamp, amount: u64) {
        self.prune(now);
        self.entries.push_back((now, amount));
        self.peak = self.peak.max(self.volume(now));
    }

    fn prune(&mut self, now: Timestamp) {
        while let Some((at, _)) = self.entries.front() {
            if self.is_live(*at, now) {
                break;
            }
            self.entries.pop_front();
        }
    }

    fn is_live(&self, at: Timestamp, now: Timestamp) -> bool {
        now.secs_since(at) < self.window_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    #[test]
    fn test_volume_slides() {
        let mut w = RollingVolumeWindow::new(100);
        w.record(ts(1000), 10);
        w.record(ts(1050), 20);
        assert_eq!(w.volume(ts(1050)), 30);
        assert_eq!(w.volume(ts(1099)), 30);
        assert_eq!(w.volume(ts(1100)), 20);
        assert_eq!(w.volume(ts(1150)), 0);
        assert_eq!(w.peak(), 30);
    }

    #[test]
    fn test_capacity_boundary() {
        let mut w = RollingVolumeWindow::new(100);
        w.record(ts(0), 60);
        assert!(w.ensure_capacity(ts(10), 40, 100).is_ok());
        assert_eq!(
            w.ensure_capacity(ts(10), 41, 100),
            Err(ProgramError::DailyLimitExceeded {
                window_volume: 60,
                amount: 41,
                limit: 100
            })
        );
    }

    #[test]
    fn test_overflowing_amount_is_rejected() {
        let mut w = RollingVolumeWindow::new(100);
        w.record(ts(0), u64::MAX - 1);
        assert!(w.ensure_capacity(ts(1), 5, u64::MAX).is_err());
    }

    #[test]
    fn test_prune_keeps_queue_small() {
        let mut w = RollingVolumeWindow::new(10);
        for i in 0..100 {
            w.record(ts(i * 10), 1);
        }
        assert_eq!(w.entries.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_window_never_exceeds_limit(
            limit in 1u64..1_000_000,
            steps in proptest::collection::vec((0u64..5_000, 1u64..400_000), 1..60),
        ) {
            let mut w = RollingVolumeWindow::new(86_400);
            let mut now = 1_700_000_000u64;
            for (dt, amount) in steps {
                now += dt;
                if w.ensure_capacity(ts(now), amount, limit).is_ok() {
                    w.record(ts(now), amount);
                }
                prop_assert!(w.volume(ts(now)) <= limit);
            }
        }
    }
}

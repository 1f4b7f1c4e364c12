//! Metric samples derived from the peer table.

use crate::domain::{MetricsSample, MonitorError, ValidatorPeer};
use crate::ports::MetricsSource;
use parking_lot::Mutex;
use shared_types::Timestamp;

#[derive(Debug, Clone, Copy)]
struct Totals {
    at: Timestamp,
    sent: u64,
    received: u64,
    errors: u64,
}

/// Samples latency from connected peers, and throughput and loss from the
/// counter deltas since the previous sample.
#[derive(Debug, Default)]
pub struct PeerTableMetrics {
    last: Mutex<Option<Totals>>,
}

impl PeerTableMetrics {
    /// Source with no history.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsSource for PeerTableMetrics {
    fn sample(
        &self,
        peers: &[ValidatorPeer],
        now: Timestamp,
    ) -> Result<MetricsSample, MonitorError> {
        let connected: Vec<&ValidatorPeer> = peers.iter().filter(|p| p.is_connected).collect();
        let latency_ms = if connected.is_empty() {
            0.0
        } else {
            connected.iter().map(|p| p.latency_ms as f64).sum::<f64>() / connected.len() as f64
        };

        let totals = Totals {
            at: now,
            sent: peers.iter().map(|p| p.messages_sent).sum(),
            received: peers.iter().map(|p| p.messages_received).sum(),
            errors: peers.iter().map(|p| p.errors).sum(),
        };

        let mut last = self.last.lock();
        let (throughput, packet_loss) = match *last {
            Some(prev) if now < prev.at => {
                return Err(MonitorError::Collection(format!(
                    "clock went backwards ({} < {})",
                    now, prev.at
                )));
            }
            Some(prev) => {
                let elapsed = now.secs_since(prev.at);
                // Counters reset when peers are removed.
                let sent = totals.sent.saturating_sub(prev.sent);
                let received = totals.received.saturating_sub(prev.received);
                let errors = totals.errors.saturating_sub(prev.errors);
                let throughput = if elapsed == 0 {
                    0.0
                } else {
                    (sent + received) as f64 / elapsed as f64
                };
                (throughput, loss_ratio(errors, sent))
            }
            None => (0.0, loss_ratio(totals.errors, totals.sent)),
        };
        *last = Some(totals);

        Ok(MetricsSample {
            timestamp: now,
            latency_ms,
            packet_loss,
            throughput,
        })
    }
}

fn loss_ratio(errors: u64, sent: u64) -> f64 {
    if sent == 0 {
        0.0
    } else {
        (errors as f64 / sent as f64).min(1.0)
    }
}

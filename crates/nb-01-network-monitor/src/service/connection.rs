//! Per-peer connection task.
//!
//! ```text
//! dial ──ok──→ session (heartbeat every interval, response within timeout)
//!  │              │ closed / failed
//!  │              ↓
//!  └──err──→ backoff ──→ dial   (at most max_reconnect_attempts in a row,
//!                                 then validator_offline and stop)
//! ```
//!
//! The task stops as soon as its cancel channel flips to `true` or its
//! sender is dropped.

use super::MonitorShared;
use crate::domain::{AlertType, TransportError, WireMessage};
use crate::ports::{PeerLink, PeerTransport};
use shared_types::Severity;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

enum SessionEnd {
    Stopped,
    Closed,
    Failed(TransportError),
}

enum Event {
    Stop,
    Tick,
    Timeout,
    Received(Result<Option<WireMessage>, TransportError>),
}

/// Resolves once `cancel` is set or its sender is gone.
pub(super) async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let _ = cancel.wait_for(|stop| *stop).await;
}

pub(super) struct PeerConnection {
    pub(super) shared: Arc<MonitorShared>,
    pub(super) transport: Arc<dyn PeerTransport>,
    pub(super) peer_id: String,
    pub(super) address: String,
    pub(super) cancel: watch::Receiver<bool>,
}

impl PeerConnection {
    pub(super) async fn run(mut self) {
        let backoff = Duration::from_secs(self.shared.config.reconnect_backoff_secs);
        let max_attempts = self.shared.config.max_reconnect_attempts;
        let mut failures: u32 = 0;

        loop {
            let dialed = tokio::select! {
                biased;
                _ = cancelled(&mut self.cancel) => return,
                r = self.transport.connect(&self.address) => r,
            };

            match dialed {
                Ok(link) => {
                    failures = 0;
                    let now = self.shared.now();
                    self.shared.update_peer(&self.peer_id, |p| p.mark_connected(now));
                    info!("[nb-01] Connected to {} at {}", self.peer_id, self.address);

                    let end = self.session(link).await;
                    self.shared.update_peer(&self.peer_id, |p| p.mark_disconnected());
                    match end {
                        SessionEnd::Stopped => return,
                        SessionEnd::Closed => {
                            info!("[nb-01] Peer {} closed the link", self.peer_id);
                        }
                        SessionEnd::Failed(e) => {
                            self.shared.update_peer(&self.peer_id, |p| p.record_error());
                            warn!("[nb-01] Link to {} failed: {}", self.peer_id, e);
                        }
                    }
                }
                Err(e) => {
                    failures += 1;
                    self.shared.update_peer(&self.peer_id, |p| p.record_error());
                    warn!(
                        "[nb-01] Dial {} failed ({}/{}): {}",
                        self.peer_id,
                        failures,
                        max_attempts + 1,
                        e
                    );
                    if failures > max_attempts {
                        self.shared.raise_once(
                            AlertType::ValidatorOffline,
                            Severity::High,
                            &format!(
                                "validator {} unreachable after {} attempts",
                                self.peer_id, failures
                            ),
                            &self.peer_id,
                        );
                        return;
                    }
                }
            }

            tokio::select! {
                biased;
                _ = cancelled(&mut self.cancel) => return,
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }

    async fn session(&mut self, mut link: Box<dyn PeerLink>) -> SessionEnd {
        let interval = Duration::from_secs(self.shared.config.heartbeat_interval_secs);
        let timeout = Duration::from_secs(self.shared.config.heartbeat_timeout_secs);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut pending: Option<(u64, Instant)> = None;
        let mut next_nonce: u64 = 0;

        loop {
            let deadline = pending.map(|(_, sent)| sent + timeout);
            let event = tokio::select! {
                biased;
                _ = cancelled(&mut self.cancel) => Event::Stop,
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => Event::Timeout,
                _ = ticker.tick() => Event::Tick,
                msg = link.recv() => Event::Received(msg),
            };

            match event {
                Event::Stop => return SessionEnd::Stopped,
                Event::Timeout => {
                    pending = None;
                    self.shared.update_peer(&self.peer_id, |p| p.record_error());
                    warn!("[nb-01] Heartbeat to {} timed out", self.peer_id);
                }
                Event::Tick => {
                    let nonce = next_nonce;
                    next_nonce = next_nonce.wrapping_add(1);
                    let heartbeat = WireMessage::Heartbeat {
                        timestamp: self.shared.now(),
                        nonce,
                    };
                    if let Err(e) = link.send(&heartbeat).await {
                        return SessionEnd::Failed(e);
                    }
                    self.shared.update_peer(&self.peer_id, |p| p.record_sent());
                    pending = Some((nonce, Instant::now()));
                }
                Event::Received(Ok(Some(message))) => {
                    let now = self.shared.now();
                    self.shared.update_peer(&self.peer_id, |p| p.record_received(now));
                    match message {
                        WireMessage::HeartbeatResponse { nonce, .. } => match pending {
                            Some((expected, sent)) if expected == nonce => {
                                let rtt = sent.elapsed().as_millis() as u64;
                                self.shared
                                    .update_peer(&self.peer_id, |p| p.record_latency(rtt, now));
                                pending = None;
                                debug!("[nb-01] Heartbeat {} from {}: {} ms", nonce, self.peer_id, rtt);
                            }
                            _ => debug!("[nb-01] Stale heartbeat response from {}", self.peer_id),
                        },
                        WireMessage::Heartbeat { nonce, .. } => {
                            let reply = WireMessage::HeartbeatResponse { timestamp: now, nonce };
                            if let Err(e) = link.send(&reply).await {
                                return SessionEnd::Failed(e);
                            }
                            self.shared.update_peer(&self.peer_id, |p| p.record_sent());
                        }
                        WireMessage::Alert {
                            alert_type,
                            severity,
                            message,
                            ..
                        } => {
                            self.shared.raise_once(
                                alert_type,
                                severity,
                                &format!("reported by {}: {}", self.peer_id, message),
                                &self.peer_id,
                            );
                        }
                        WireMessage::Metrics { sample, .. } => {
                            debug!(
                                "[nb-01] Peer {} reports {:.0} ms latency",
                                self.peer_id, sample.latency_ms
                            );
                        }
                        WireMessage::Unknown => {
                            debug!("[nb-01] Ignoring unknown message from {}", self.peer_id);
                        }
                    }
                }
                Event::Received(Ok(None)) => return SessionEnd::Closed,
                Event::Received(Err(TransportError::Malformed(reason))) => {
                    self.shared.update_peer(&self.peer_id, |p| p.record_error());
                    warn!("[nb-01] Malformed message from {}: {}", self.peer_id, reason);
                }
                Event::Received(Err(e)) => return SessionEnd::Failed(e),
            }
        }
    }
}

/// Answer heartbeats on an inbound link until it closes or `cancel` is set.
pub(super) async fn serve_inbound(
    shared: Arc<MonitorShared>,
    mut link: Box<dyn PeerLink>,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        let received = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => return,
            msg = link.recv() => msg,
        };
        match received {
            Ok(Some(WireMessage::Heartbeat { nonce, .. })) => {
                let reply = WireMessage::HeartbeatResponse {
                    timestamp: shared.now(),
                    nonce,
                };
                if let Err(e) = link.send(&reply).await {
                    debug!("[nb-01] Inbound link failed: {}", e);
                    return;
                }
            }
            Ok(Some(_)) => {}
            Ok(None) => return,
            Err(TransportError::Malformed(reason)) => {
                debug!("[nb-01] Malformed inbound message: {}", reason);
            }
            Err(e) => {
                debug!("[nb-01] Inbound link failed: {}", e);
                return;
            }
        }
    }
}

//! # Network Monitor Service
//!
//! Implements `NetworkMonitorApi`.
//!
//! Each registered peer gets its own connection task (see `connection`).
//! Tasks only ever update an existing peer entry; removing the peer first
//! and cancelling the task second means a late update is a no-op.

mod connection;

use crate::adapters::PeerTableMetrics;
use crate::algorithms::{health_components, health_score, partition_detected, HealthInputs};
use crate::domain::{
    AlertLog, AlertType, HealthStatus, MetricsSample, MonitorConfig, MonitorError, NetworkAlert,
    NetworkHealth, NetworkTopology, ValidatorPeer,
};
use crate::ports::{MetricsSource, NetworkMonitorApi, PeerLink, PeerTransport};
use async_trait::async_trait;
use connection::PeerConnection;
use parking_lot::{Mutex, RwLock};
use shared_types::{PublicKey, Severity, SharedTimeSource, SystemTimeSource, Timestamp};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Source used for network-wide alerts.
pub const NETWORK_SOURCE: &str = "network";

/// Source used for the monitor's own failures.
pub const MONITOR_SOURCE: &str = "monitor";

/// State shared with connection tasks.
pub(crate) struct MonitorShared {
    config: MonitorConfig,
    time: SharedTimeSource,
    peers: RwLock<HashMap<String, ValidatorPeer>>,
    alerts: RwLock<AlertLog>,
    events: broadcast::Sender<NetworkAlert>,
}

impl MonitorShared {
    fn now(&self) -> Timestamp {
        self.time.now()
    }

    /// Apply `f` to a registered peer. Returns false if it is gone.
    fn update_peer(&self, id: &str, f: impl FnOnce(&mut ValidatorPeer)) -> bool {
        match self.peers.write().get_mut(id) {
            Some(peer) => {
                f(peer);
                true
            }
            None => false,
        }
    }

    fn raise(
        &self,
        alert_type: AlertType,
        severity: Severity,
        message: &str,
        source: &str,
    ) -> NetworkAlert {
        let now = self.now();
        let alert = self
            .alerts
            .write()
            .append(alert_type, severity, message, source, now);
        self.announce(&alert);
        alert
    }

    /// Raise unless an unresolved alert of this kind and source exists.
    fn raise_once(
        &self,
        alert_type: AlertType,
        severity: Severity,
        message: &str,
        source: &str,
    ) -> Option<NetworkAlert> {
        let now = self.now();
        let alert = {
            let mut alerts = self.alerts.write();
            if alerts.find_active(alert_type, source).is_some() {
                debug!("[nb-01] {} already active for {}", alert_type, source);
                return None;
            }
            alerts.append(alert_type, severity, message, source, now)
        };
        self.announce(&alert);
        Some(alert)
    }

    fn announce(&self, alert: &NetworkAlert) {
        match alert.severity {
            Severity::Critical | Severity::High => error!(
                "[nb-01] ALERT {} ({}): {}",
                alert.alert_type, alert.severity, alert.message
            ),
            _ => warn!(
                "[nb-01] Alert {} ({}): {}",
                alert.alert_type, alert.severity, alert.message
            ),
        }
        // No subscribers is fine.
        let _ = self.events.send(alert.clone());
    }
}

struct PeerTask {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// The peer network monitor.
pub struct NetworkMonitor {
    shared: Arc<MonitorShared>,
    transport: Arc<dyn PeerTransport>,
    metrics: Arc<dyn MetricsSource>,
    samples: RwLock<VecDeque<MetricsSample>>,
    rounds: RwLock<VecDeque<f64>>,
    tasks: Mutex<HashMap<String, PeerTask>>,
    inbound: watch::Sender<bool>,
    closed: AtomicBool,
}

impl NetworkMonitor {
    /// Monitor on the system clock, sampling from the peer table.
    pub fn new(config: MonitorConfig, transport: Arc<dyn PeerTransport>) -> Self {
        Self::with_dependencies(
            config,
            transport,
            Arc::new(PeerTableMetrics::new()),
            Arc::new(SystemTimeSource::new()),
        )
    }

    /// Monitor with explicit collaborators.
    pub fn with_dependencies(
        config: MonitorConfig,
        transport: Arc<dyn PeerTransport>,
        metrics: Arc<dyn MetricsSource>,
        time: SharedTimeSource,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (inbound, _) = watch::channel(false);
        Self {
            shared: Arc::new(MonitorShared {
                config,
                time,
                peers: RwLock::new(HashMap::new()),
                alerts: RwLock::new(AlertLog::new()),
                events,
            }),
            transport,
            metrics,
            samples: RwLock::new(VecDeque::new()),
            rounds: RwLock::new(VecDeque::new()),
            tasks: Mutex::new(HashMap::new()),
            inbound,
            closed: AtomicBool::new(false),
        }
    }

    /// Configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.shared.config
    }

    /// Every alert ever raised, oldest first.
    pub fn alert_history(&self) -> Vec<NetworkAlert> {
        self.shared.alerts.read().all().to_vec()
    }

    /// Sample through the metric source and record it.
    ///
    /// A failed collection raises a critical `system_error` alert and is
    /// returned to the caller; it never stops the caller's loop.
    pub fn collect_metrics(&self) -> Result<Vec<NetworkAlert>, MonitorError> {
        let now = self.shared.now();
        let peers: Vec<ValidatorPeer> = self.shared.peers.read().values().cloned().collect();
        match self.metrics.sample(&peers, now) {
            Ok(sample) => Ok(self.record_sample(sample)),
            Err(e) => {
                error!("[nb-01] Metric collection failed: {}", e);
                self.shared.raise_once(
                    AlertType::SystemError,
                    Severity::Critical,
                    &format!("metric collection failed: {e}"),
                    MONITOR_SOURCE,
                );
                Err(e)
            }
        }
    }

    /// Answer heartbeats on an accepted inbound link until it closes or the
    /// monitor shuts down.
    pub fn serve_inbound(&self, link: Box<dyn PeerLink>) -> JoinHandle<()> {
        tokio::spawn(connection::serve_inbound(
            self.shared.clone(),
            link,
            self.inbound.subscribe(),
        ))
    }

    /// Stop every connection task and wait for them. Later `add_peer` calls fail.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.inbound.send_replace(true);
        let tasks: Vec<PeerTask> = self.tasks.lock().drain().map(|(_, t)| t).collect();
        let count = tasks.len();
        for task in &tasks {
            task.cancel.send_replace(true);
        }
        for task in tasks {
            if let Err(e) = task.handle.await {
                warn!("[nb-01] Connection task ended abnormally: {}", e);
            }
        }
        for peer in self.shared.peers.write().values_mut() {
            peer.mark_disconnected();
        }
        info!("[nb-01] Network monitor stopped ({} connection tasks)", count);
    }

    fn record_sample(&self, sample: MetricsSample) -> Vec<NetworkAlert> {
        let config = &self.shared.config;
        {
            let mut samples = self.samples.write();
            samples.push_back(sample);
            while samples.len() > config.sample_capacity {
                samples.pop_front();
            }
        }

        let mut raised = Vec::new();
        if sample.latency_ms > config.latency_alert_ms {
            raised.extend(self.shared.raise_once(
                AlertType::HighLatency,
                Severity::Medium,
                &format!("average latency {:.0} ms", sample.latency_ms),
                NETWORK_SOURCE,
            ));
        }
        if sample.packet_loss > config.packet_loss_alert {
            raised.extend(self.shared.raise_once(
                AlertType::PacketLoss,
                Severity::Medium,
                &format!("packet loss {:.1}%", sample.packet_loss * 100.0),
                NETWORK_SOURCE,
            ));
        }

        let health = self.health_now();
        if health.score < config.degraded_health_score {
            raised.extend(self.shared.raise_once(
                AlertType::NetworkDegradation,
                Severity::High,
                &format!("health score {:.1}", health.score),
                NETWORK_SOURCE,
            ));
        }

        let topology = self.topology_now();
        if topology.partition_detected {
            raised.extend(self.shared.raise_once(
                AlertType::NetworkPartition,
                Severity::Critical,
                &format!(
                    "{}/{} validators connected",
                    topology.connected_validators, topology.total_validators
                ),
                NETWORK_SOURCE,
            ));
        }
        raised
    }

    fn consensus_efficiency(&self) -> Option<f64> {
        let rounds = self.rounds.read();
        if rounds.is_empty() {
            None
        } else {
            Some(rounds.iter().sum::<f64>() / rounds.len() as f64)
        }
    }

    /// `(connected, total, mean connected latency, error ratio)`.
    fn peer_summary(&self) -> (usize, usize, f64, f64) {
        let peers = self.shared.peers.read();
        let total = peers.len();
        let connected: Vec<&ValidatorPeer> = peers.values().filter(|p| p.is_connected).collect();
        let latency = if connected.is_empty() {
            0.0
        } else {
            connected.iter().map(|p| p.latency_ms as f64).sum::<f64>() / connected.len() as f64
        };
        let sent: u64 = peers.values().map(|p| p.messages_sent).sum();
        let errors: u64 = peers.values().map(|p| p.errors).sum();
        let error_ratio = if sent == 0 {
            0.0
        } else {
            (errors as f64 / sent as f64).min(1.0)
        };
        (connected.len(), total, latency, error_ratio)
    }

    fn health_now(&self) -> NetworkHealth {
        let config = &self.shared.config;
        let (connected, total, latency, error_ratio) = self.peer_summary();
        let recent: Vec<MetricsSample> = {
            let samples = self.samples.read();
            let skip = samples.len().saturating_sub(config.recent_samples);
            samples.iter().skip(skip).copied().collect()
        };
        let consensus = self.consensus_efficiency();

        let components = health_components(&HealthInputs {
            connected,
            total,
            recent: &recent,
            peer_latency_ms: latency,
            peer_error_ratio: error_ratio,
            consensus_efficiency: consensus,
            expected_throughput: config.expected_throughput,
        });
        let score = health_score(&components);

        let mut issues = Vec::new();
        if partition_detected(connected, total, config.quorum) {
            issues.push(format!("partition: {connected}/{total} validators connected"));
        }
        if let Some(last) = recent.last() {
            if last.latency_ms > config.latency_alert_ms {
                issues.push(format!("high latency: {:.0} ms", last.latency_ms));
            }
            if last.packet_loss > config.packet_loss_alert {
                issues.push(format!("packet loss: {:.1}%", last.packet_loss * 100.0));
            }
        }
        if let Some(efficiency) = consensus {
            let quorum = config.quorum;
            if efficiency * (quorum.den as f64) < quorum.num as f64 {
                issues.push(format!(
                    "consensus participation {:.0}%",
                    efficiency * 100.0
                ));
            }
        }

        NetworkHealth {
            score,
            status: HealthStatus::from_score(score),
            components,
            issues,
        }
    }

    fn topology_now(&self) -> NetworkTopology {
        let (connected, total, latency, _) = self.peer_summary();
        NetworkTopology {
            total_validators: total,
            connected_validators: connected,
            average_latency_ms: latency,
            partition_detected: partition_detected(connected, total, self.shared.config.quorum),
            consensus_efficiency: self.consensus_efficiency().unwrap_or(1.0),
            health_score: self.health_now().score,
        }
    }

    /// Whether the condition behind an auto-resolvable alert still holds.
    fn condition_holds(&self, alert_type: AlertType) -> bool {
        let config = &self.shared.config;
        let latest = self.samples.read().back().copied();
        match alert_type {
            AlertType::HighLatency => latest.is_some_and(|s| s.latency_ms > config.latency_alert_ms),
            AlertType::PacketLoss => latest.is_some_and(|s| s.packet_loss > config.packet_loss_alert),
            AlertType::NetworkDegradation => self.health_now().score < config.degraded_health_score,
            AlertType::NetworkPartition => self.topology_now().partition_detected,
            AlertType::ValidatorOffline | AlertType::SystemError | AlertType::SecurityIncident => {
                true
            }
        }
    }
}

#[async_trait]
impl NetworkMonitorApi for NetworkMonitor {
    async fn add_peer(
        &self,
        id: &str,
        address: &str,
        public_key: PublicKey,
    ) -> Result<ValidatorPeer, MonitorError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MonitorError::ShutDown);
        }
        let peer = ValidatorPeer::new(id, address, public_key);
        {
            let mut peers = self.shared.peers.write();
            if peers.contains_key(id) {
                return Err(MonitorError::PeerExists(id.to_string()));
            }
            peers.insert(id.to_string(), peer.clone());
        }

        let (cancel, cancel_rx) = watch::channel(false);
        let connection = PeerConnection {
            shared: self.shared.clone(),
            transport: self.transport.clone(),
            peer_id: id.to_string(),
            address: address.to_string(),
            cancel: cancel_rx,
        };
        let handle = tokio::spawn(connection.run());
        self.tasks
            .lock()
            .insert(id.to_string(), PeerTask { cancel, handle });

        info!("[nb-01] Peer {} registered at {}", id, address);
        Ok(peer)
    }

    async fn remove_peer(&self, id: &str) -> Result<ValidatorPeer, MonitorError> {
        let peer = self
            .shared
            .peers
            .write()
            .remove(id)
            .ok_or_else(|| MonitorError::PeerNotFound(id.to_string()))?;
        let task = self.tasks.lock().remove(id);
        if let Some(task) = task {
            task.cancel.send_replace(true);
            if let Err(e) = task.handle.await {
                warn!("[nb-01] Connection task for {} ended abnormally: {}", id, e);
            }
        }
        info!("[nb-01] Peer {} removed", id);
        Ok(peer)
    }

    async fn record_metrics(&self, sample: MetricsSample) -> Vec<NetworkAlert> {
        self.record_sample(sample)
    }

    async fn network_topology(&self) -> NetworkTopology {
        self.topology_now()
    }

    async fn assess_network_health(&self) -> NetworkHealth {
        self.health_now()
    }

    async fn create_alert(
        &self,
        alert_type: AlertType,
        severity: Severity,
        message: &str,
        source: &str,
    ) -> NetworkAlert {
        self.shared.raise(alert_type, severity, message, source)
    }

    async fn resolve_alert(&self, id: Uuid) -> Result<bool, MonitorError> {
        let now = self.shared.now();
        let resolved = self
            .shared
            .alerts
            .write()
            .resolve(id, now)
            .ok_or(MonitorError::AlertNotFound(id))?;
        if resolved {
            info!("[nb-01] Alert {} resolved", id);
        }
        Ok(resolved)
    }

    async fn sweep_alerts(&self) -> usize {
        let now = self.shared.now();
        let max_age = self.shared.config.max_alert_age_secs;

        let candidates: HashSet<AlertType> = self
            .shared
            .alerts
            .read()
            .all()
            .iter()
            .filter(|a| !a.is_resolved() && a.alert_type.auto_resolvable())
            .map(|a| a.alert_type)
            .collect();
        let cleared: HashSet<AlertType> = candidates
            .into_iter()
            .filter(|kind| !self.condition_holds(*kind))
            .collect();

        let (resolved, pruned) = {
            let mut alerts = self.shared.alerts.write();
            let resolved = alerts.resolve_where(now, |a| {
                a.alert_type.auto_resolvable()
                    && now.secs_since(a.timestamp) >= max_age
                    && cleared.contains(&a.alert_type)
            });
            let pruned =
                alerts.prune_resolved(now, self.shared.config.resolved_alert_retention_secs);
            (resolved, pruned)
        };
        if resolved > 0 {
            info!("[nb-01] Sweep auto-resolved {} alerts", resolved);
        }
        if pruned > 0 {
            debug!("[nb-01] Dropped {} resolved alerts past retention", pruned);
        }
        resolved
    }

    async fn record_consensus_round(&self, participants: usize, expected: usize) {
        if expected == 0 {
            debug!("[nb-01] Ignoring consensus round with no expected participants");
            return;
        }
        let ratio = (participants as f64 / expected as f64).min(1.0);
        let mut rounds = self.rounds.write();
        rounds.push_back(ratio);
        while rounds.len() > self.shared.config.consensus_window {
            rounds.pop_front();
        }
    }

    async fn active_alerts(&self) -> Vec<NetworkAlert> {
        self.shared.alerts.read().active()
    }

    async fn peer(&self, id: &str) -> Option<ValidatorPeer> {
        self.shared.peers.read().get(id).cloned()
    }

    async fn peers(&self) -> Vec<ValidatorPeer> {
        let mut peers: Vec<ValidatorPeer> = self.shared.peers.read().values().cloned().collect();
        peers.sort_by(|a, b| a.id.cmp(&b.id));
        peers
    }

    fn subscribe(&self) -> broadcast::Receiver<NetworkAlert> {
        self.shared.events.subscribe()
    }
}

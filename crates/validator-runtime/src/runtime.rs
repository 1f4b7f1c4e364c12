//! # Validator Runtime
//!
//! Builds the four subsystems, connects them and drives them from one
//! scheduler.
//!
//! ## Wiring
//!
//! ```text
//!  NetworkMonitor (nb-01) ──topology, peers──→ security scan
//!        ↑ consensus participation                │
//!        │                                        ↓
//!  BridgeCoordinator ──validate_*──→ SecurityManager (nb-02)
//!        │      ↑                                 │
//!        │      └──── LockdownActivated ──────────┘ (emergency pause)
//!        ↓
//!  SecureStateStore (nb-04) ──integrity violation──→ data_corruption threat
//!        │
//!        ↓ finalize
//!  SettlementProgram (nb-03)
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Initialize the bridge program if no validator has yet
//! 2. Register peers with the monitor and the Sybil estimator
//! 3. Bind the peer listener
//! 4. Start the event listeners and periodic jobs
//!
//! ## Shutdown Sequence
//!
//! 1. Stop the scheduler and wait for running jobs
//! 2. Stop peer connection tasks
//! 3. Close the store

use crate::adapters::{security_snapshot, SecurityTamperObserver, SourceCounterBook};
use crate::config::{ConfigError, ValidatorConfig};
use crate::coordinator::{
    BridgeCoordinator, CoordinatorDependencies, CoordinatorError, Processed, RoundStatus,
};
use crate::scheduler::TaskScheduler;
use bridge_telemetry::{
    metric_inc, ALERTS_RAISED, HEALTH_SCORE, PEERS_CONNECTED, SUBSYSTEM_ERRORS, THREATS_DETECTED,
};
use nb_01_network_monitor::{
    MonitorError, NetworkHealth, NetworkMonitor, NetworkMonitorApi, PeerLink, PeerTableMetrics,
    PeerTransport, TcpPeerListener, TcpTransport, TransportError,
};
use nb_02_security_manager::{
    LogNotificationSink, PatternInspector, ReputationBook, ReputationSource, SecurityDependencies,
    SecurityEvent, SecurityManager, SecurityManagerApi, SecurityThreat, SubnetSybilEstimator,
    ZScoreAnomalyDetector,
};
use nb_03_bridge_protocol::{
    InMemoryTokenLedger, InProcessSettlement, InitializeParams, ProgramError,
    SettlementProgramApi,
};
use nb_04_state_store::{
    InMemoryBackend, KeyValueBackend, SecureStateStore, StoreError, ValidatorRecord,
};
use shared_crypto::{Ed25519KeyPair, SecretKey};
use shared_types::{SharedTimeSource, SystemTimeSource, ValidatorId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bridge program setup failed.
    #[error("Settlement program: {0}")]
    Program(#[from] ProgramError),

    /// Shared store failure.
    #[error("State store: {0}")]
    Store(#[from] StoreError),

    /// Peer registration failed.
    #[error("Network monitor: {0}")]
    Monitor(#[from] MonitorError),

    /// The peer listener could not bind.
    #[error("Peer listener: {0}")]
    Transport(#[from] TransportError),
}

/// External collaborators: clock, peer transport, store backend and
/// settlement program.
pub struct RuntimeParts {
    /// Clock shared by every subsystem.
    pub time: SharedTimeSource,
    /// Dialer for peer links.
    pub transport: Arc<dyn PeerTransport>,
    /// Shared key-value backend.
    pub backend: Arc<dyn KeyValueBackend>,
    /// Destination-chain program.
    pub settlement: Arc<dyn SettlementProgramApi>,
}

impl RuntimeParts {
    /// System clock, TCP peers, in-memory store and in-process program.
    pub fn standard(config: &ValidatorConfig) -> Self {
        let time: SharedTimeSource = Arc::new(SystemTimeSource::new());
        let timeout = Duration::from_secs(config.network.monitor.heartbeat_timeout_secs);
        Self {
            transport: Arc::new(TcpTransport::new(timeout)),
            backend: Arc::new(InMemoryBackend::with_time_source(time.clone())),
            settlement: Arc::new(InProcessSettlement::new(
                config.bridge.policy(),
                Arc::new(InMemoryTokenLedger::new()),
                time.clone(),
            )),
            time,
        }
    }
}

/// Everything the periodic jobs operate on.
pub struct ValidatorServices {
    /// Loaded configuration.
    pub config: ValidatorConfig,
    /// This validator.
    pub identity: ValidatorId,
    /// Peer network monitor.
    pub monitor: Arc<NetworkMonitor>,
    /// Security manager.
    pub security: Arc<SecurityManager>,
    /// Reputation scores behind the security manager.
    pub reputation: Arc<ReputationBook>,
    /// Sybil estimator fed from the peer list and the registry.
    pub sybil: Arc<SubnetSybilEstimator>,
    /// Shared state store.
    pub store: Arc<SecureStateStore>,
    /// Settlement program.
    pub settlement: Arc<dyn SettlementProgramApi>,
    /// Bridge coordinator.
    pub coordinator: Arc<BridgeCoordinator>,
    /// Per-source counters for the security scan.
    pub counters: Arc<SourceCounterBook>,
    /// Clock.
    pub time: SharedTimeSource,
}

impl ValidatorServices {
    /// Sample network metrics and keep the topology in the store.
    pub async fn collect_metrics(&self) {
        if let Err(e) = self.monitor.collect_metrics() {
            metric_inc!(SUBSYSTEM_ERRORS, &["nb-01", "collect_metrics"]);
            warn!("[runtime] Metric collection failed: {}", e);
            return;
        }
        let topology = self.monitor.network_topology().await;
        if let Err(e) = self
            .store
            .record_metrics_sample(self.time.now().as_secs(), &topology)
            .await
        {
            metric_inc!(SUBSYSTEM_ERRORS, &["nb-04", "metrics_sample"]);
            warn!("[runtime] Could not store metrics sample: {}", e);
        }
    }

    /// Assess health and publish the gauges.
    pub async fn check_health(&self) -> NetworkHealth {
        let health = self.monitor.assess_network_health().await;
        let topology = self.monitor.network_topology().await;
        HEALTH_SCORE.set(health.score);
        PEERS_CONNECTED.set(topology.connected_validators as f64);
        if !health.issues.is_empty() {
            info!(
                "[runtime] Network health {:.1} ({:?}): {}",
                health.score,
                health.status,
                health.issues.join("; ")
            );
        }
        health
    }

    /// Resolve alerts whose condition cleared.
    pub async fn sweep_alerts(&self) -> usize {
        self.monitor.sweep_alerts().await
    }

    /// Drop old threat records and expired quarantines.
    pub async fn collect_garbage(&self) -> (usize, usize) {
        let threats = self.security.gc_threats().await;
        let quarantines = self.security.gc_quarantine();
        if threats + quarantines > 0 {
            debug!(
                "[runtime] Dropped {} threats and {} quarantines",
                threats, quarantines
            );
        }
        (threats, quarantines)
    }

    /// Rotate keys when the security level's period elapsed.
    pub fn check_key_rotation(&self) -> bool {
        let rotated = self.security.rotate_keys_if_due();
        if rotated {
            info!(
                "[runtime] Rotated keys (generation {})",
                self.security.key_generation()
            );
        }
        rotated
    }

    /// Sign queued requests. Refused while the emergency flag is set.
    pub async fn drain_pending(&self) -> Vec<Processed> {
        match self
            .coordinator
            .drain_pending(self.config.scheduler.max_drain_batch)
            .await
        {
            Ok(processed) => {
                for item in &processed {
                    if let Ok(status) = &item.result {
                        self.report_round(status).await;
                    }
                }
                processed
            }
            Err(CoordinatorError::EmergencyActive(reason)) => {
                debug!("[runtime] Queue held: emergency active ({})", reason);
                Vec::new()
            }
            Err(CoordinatorError::NotAValidator(id)) => {
                debug!("[runtime] Queue left to the validator set: {} is not a member", id);
                Vec::new()
            }
            Err(e) => {
                metric_inc!(SUBSYSTEM_ERRORS, &["coordinator", "drain"]);
                warn!("[runtime] Pending drain failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Poll every round this validator has open, then join peers' rounds.
    pub async fn poll_rounds(&self) -> Vec<(String, Result<RoundStatus, CoordinatorError>)> {
        let mut results = self.coordinator.poll_open_rounds().await;
        match self.coordinator.join_open_rounds().await {
            Ok(joined) => results.extend(joined.into_iter().map(|p| (p.round, p.result))),
            Err(e) => {
                metric_inc!(SUBSYSTEM_ERRORS, &["coordinator", "join"]);
                warn!("[runtime] Round discovery failed: {}", e);
            }
        }
        for (_, result) in &results {
            if let Ok(status) = result {
                self.report_round(status).await;
            }
        }
        results
    }

    /// Refresh this validator's registry entry and register every listed
    /// peer with the Sybil estimator. Returns the registry size.
    pub async fn refresh_registry(&self) -> Result<usize, StoreError> {
        let score = self.reputation.reputation(&self.identity.to_hex());
        self.store
            .put_validator(&ValidatorRecord {
                validator_id: self.identity,
                address: self.config.node.listen_address.clone(),
                last_heartbeat: self.time.now(),
                reputation: (score.clamp(0.0, 1.0) * 100.0).round() as u8,
            })
            .await?;

        let records = self.store.list_validators().await?;
        for record in &records {
            if record.validator_id != self.identity && !record.address.is_empty() {
                self.sybil.register(record.validator_id, &record.address);
            }
        }
        Ok(records.len())
    }

    /// Feed counters and topology to the security manager.
    pub async fn security_scan(&self) -> Vec<SecurityThreat> {
        let topology = self.monitor.network_topology().await;
        let peers = self.monitor.peers().await;
        let snapshot = security_snapshot(self.counters.drain(), &topology, &peers);
        let threats = self.security.monitor_network_security(&snapshot).await;
        if !threats.is_empty() {
            warn!("[runtime] Security scan raised {} threats", threats.len());
        }
        threats
    }

    /// Propose an emergency pause after a local lockdown.
    pub async fn on_lockdown(&self, reason: &str) {
        match self.coordinator.propose_emergency_pause(reason).await {
            Ok(status) => {
                warn!("[runtime] Emergency pause proposed: {:?}", status);
                self.report_round(&status).await;
            }
            Err(e) => error!("[runtime] Could not propose emergency pause: {}", e),
        }
    }

    async fn report_round(&self, status: &RoundStatus) {
        if let RoundStatus::Finalized {
            approvals,
            validators,
            ..
        } = status
        {
            self.monitor
                .record_consensus_round(*approvals, *validators)
                .await;
        }
    }
}

/// A running validator.
pub struct ValidatorRuntime {
    services: Arc<ValidatorServices>,
    scheduler: TaskScheduler,
}

impl ValidatorRuntime {
    /// Runtime with the standard collaborators.
    pub fn new(config: ValidatorConfig) -> Result<Self, RuntimeError> {
        let parts = RuntimeParts::standard(&config);
        Self::with_parts(config, parts)
    }

    /// Runtime with explicit collaborators.
    pub fn with_parts(config: ValidatorConfig, parts: RuntimeParts) -> Result<Self, RuntimeError> {
        config.validate()?;
        let keypair = Ed25519KeyPair::from_seed(config.signing_seed()?);
        let identity = ValidatorId::from_public_key(*keypair.public_key().as_bytes());
        info!("[runtime] Building validator {} ({})", config.node.name, identity);

        let monitor = Arc::new(NetworkMonitor::with_dependencies(
            config.network.monitor.clone(),
            parts.transport,
            Arc::new(PeerTableMetrics::new()),
            parts.time.clone(),
        ));

        let reputation = Arc::new(ReputationBook::new(config.security.default_reputation));
        let sybil = Arc::new(SubnetSybilEstimator::new());
        let security = Arc::new(SecurityManager::new(
            config.security.clone(),
            SecurityDependencies {
                reputation: reputation.clone(),
                anomaly: Arc::new(ZScoreAnomalyDetector::default()),
                sybil: sybil.clone(),
                inspector: Arc::new(PatternInspector::default()),
                notifier: Arc::new(LogNotificationSink),
                time: parts.time.clone(),
            },
        ));

        let store = Arc::new(
            SecureStateStore::new(
                parts.backend,
                SecretKey::from_bytes(config.store_key()?),
                config.store.store_config(),
            )
            .with_tamper_observer(Arc::new(SecurityTamperObserver::new(security.clone()))),
        );

        let counters = Arc::new(SourceCounterBook::new());
        let coordinator = Arc::new(BridgeCoordinator::new(
            keypair,
            CoordinatorDependencies {
                store: store.clone(),
                security: security.clone(),
                settlement: parts.settlement.clone(),
                counters: counters.clone(),
                time: parts.time.clone(),
            },
        ));

        Ok(Self {
            services: Arc::new(ValidatorServices {
                config,
                identity,
                monitor,
                security,
                reputation,
                sybil,
                store,
                settlement: parts.settlement,
                coordinator,
                counters,
                time: parts.time,
            }),
            scheduler: TaskScheduler::new(),
        })
    }

    /// Subsystems and job bodies.
    pub fn services(&self) -> &Arc<ValidatorServices> {
        &self.services
    }

    /// This validator.
    pub fn identity(&self) -> ValidatorId {
        self.services.identity
    }

    /// The bridge coordinator.
    pub fn coordinator(&self) -> &Arc<BridgeCoordinator> {
        &self.services.coordinator
    }

    /// Names of running tasks.
    pub fn task_names(&self) -> Vec<String> {
        self.scheduler.task_names()
    }

    /// Start the validator.
    pub async fn start(&self) -> Result<(), RuntimeError> {
        let s = &self.services;
        info!("===========================================");
        info!("  NockBridge Validator {}", s.config.node.name);
        info!("  Identity: {}", s.identity.to_hex());
        info!("===========================================");

        self.ensure_bridge_initialized().await?;
        self.register_peers().await?;
        if let Err(e) = s.refresh_registry().await {
            warn!("[runtime] Initial registry refresh failed: {}", e);
        }
        self.start_listener().await?;
        self.start_event_listeners();
        self.schedule_jobs();

        info!(
            "[runtime] Validator running with {} tasks",
            self.scheduler.task_names().len()
        );
        Ok(())
    }

    /// Stop jobs, peer links and the store, in that order.
    pub async fn shutdown(&self) {
        info!("[runtime] Initiating graceful shutdown...");
        let tasks = self.scheduler.shutdown().await;
        self.services.monitor.shutdown().await;
        self.services.store.close();
        info!("[runtime] Shutdown complete ({} tasks stopped)", tasks);
    }

    async fn ensure_bridge_initialized(&self) -> Result<(), RuntimeError> {
        let s = &self.services;
        match s.settlement.state().await {
            Ok(state) => {
                info!(
                    "[runtime] Bridge program: {} validators, threshold {}, nonce {}",
                    state.validators.len(),
                    state.threshold,
                    state.nonce
                );
                return Ok(());
            }
            Err(ProgramError::NotInitialized) => {}
            Err(e) => return Err(e.into()),
        }

        let bridge = &s.config.bridge;
        let mut validators = bridge.validator_keys()?;
        let threshold = if validators.is_empty() {
            warn!("[runtime] No validator set configured; running a single-validator bridge");
            validators.push(*s.identity.as_bytes());
            1
        } else {
            bridge.threshold
        };

        let params = InitializeParams {
            authority: *s.identity.as_bytes(),
            validators,
            threshold,
            fee_rate_bps: bridge.fee_rate_bps,
            daily_limit: bridge.daily_limit,
            emergency_delay_secs: bridge.emergency_delay_secs,
        };
        match s.settlement.initialize_bridge(params).await {
            Ok(()) => {
                info!("[runtime] Bridge program initialized");
                Ok(())
            }
            // Another validator got there first.
            Err(ProgramError::AlreadyInitialized) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn register_peers(&self) -> Result<(), RuntimeError> {
        let s = &self.services;
        for peer in &s.config.network.peers {
            let key = peer.public_key_bytes()?;
            s.monitor.add_peer(&peer.id, &peer.address, key).await?;
            s.sybil
                .register(ValidatorId::from_public_key(key), &peer.address);
        }
        info!(
            "[runtime] Registered {} peers",
            s.config.network.peers.len()
        );
        Ok(())
    }

    async fn start_listener(&self) -> Result<(), RuntimeError> {
        let address = self.services.config.node.listen_address.clone();
        if address.is_empty() {
            info!("[runtime] Peer listener disabled");
            return Ok(());
        }
        let listener = TcpPeerListener::bind(&address).await?;
        info!("[runtime] Listening for peers on {}", listener.local_addr()?);

        let monitor = self.services.monitor.clone();
        self.scheduler
            .spawn("peer-listener", move |mut shutdown| async move {
                loop {
                    tokio::select! {
                        biased;
                        _ = shutdown.wait_for(|stop| *stop) => break,
                        accepted = listener.accept() => match accepted {
                            Ok((link, remote)) => {
                                debug!("[runtime] Inbound peer link from {}", remote);
                                let link: Box<dyn PeerLink> = Box::new(link);
                                monitor.serve_inbound(link);
                            }
                            Err(e) => warn!("[runtime] Accept failed: {}", e),
                        },
                    }
                }
            });
        Ok(())
    }

    fn start_event_listeners(&self) {
        let services = self.services.clone();
        let mut events = self.services.security.subscribe();
        self.scheduler
            .spawn("security-events", move |mut shutdown| async move {
                loop {
                    let event = tokio::select! {
                        biased;
                        _ = shutdown.wait_for(|stop| *stop) => break,
                        event = events.recv() => event,
                    };
                    match event {
                        Ok(SecurityEvent::ThreatDetected(threat)) => {
                            metric_inc!(
                                THREATS_DETECTED,
                                &[threat.threat_type.as_str(), &threat.severity.to_string()]
                            );
                        }
                        Ok(SecurityEvent::LockdownActivated { reason }) => {
                            services.on_lockdown(&reason).await;
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(missed)) => {
                            warn!("[runtime] Missed {} security events", missed);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            });

        let mut alerts = self.services.monitor.subscribe();
        self.scheduler
            .spawn("network-alerts", move |mut shutdown| async move {
                loop {
                    let alert = tokio::select! {
                        biased;
                        _ = shutdown.wait_for(|stop| *stop) => break,
                        alert = alerts.recv() => alert,
                    };
                    match alert {
                        Ok(alert) => {
                            metric_inc!(
                                ALERTS_RAISED,
                                &[alert.alert_type.as_str(), &alert.severity.to_string()]
                            );
                        }
                        Err(RecvError::Lagged(missed)) => {
                            warn!("[runtime] Missed {} network alerts", missed);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            });
    }

    fn schedule_jobs(&self) {
        let i = &self.services.config.scheduler;
        self.every("collect-metrics", i.metrics_interval_secs, |s| async move {
            s.collect_metrics().await;
        });
        self.every("health-check", i.health_check_secs, |s| async move {
            s.check_health().await;
        });
        self.every("alert-sweep", i.alert_sweep_secs, |s| async move {
            s.sweep_alerts().await;
        });
        self.every("threat-gc", i.threat_gc_secs, |s| async move {
            s.collect_garbage().await;
        });
        self.every("key-rotation", i.key_rotation_check_secs, |s| async move {
            s.check_key_rotation();
        });
        self.every("pending-drain", i.pending_drain_secs, |s| async move {
            s.drain_pending().await;
        });
        self.every("round-poll", i.round_poll_secs, |s| async move {
            s.poll_rounds().await;
        });
        self.every("registry-refresh", i.registry_refresh_secs, |s| async move {
            if let Err(e) = s.refresh_registry().await {
                metric_inc!(SUBSYSTEM_ERRORS, &["nb-04", "registry_refresh"]);
                warn!("[runtime] Registry refresh failed: {}", e);
            }
        });
        self.every("security-scan", i.security_scan_secs, |s| async move {
            s.security_scan().await;
        });
    }

    fn every<F, Fut>(&self, name: &str, secs: u64, job: F)
    where
        F: Fn(Arc<ValidatorServices>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let services = self.services.clone();
        self.scheduler
            .schedule_periodic(name, Duration::from_secs(secs), move || job(services.clone()));
    }
}

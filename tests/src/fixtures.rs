//! # Cluster Fixtures
//!
//! Validator runtimes sharing one clock, one store backend, one settlement
//! program and one in-memory peer network, the way a deployment shares the
//! store and the destination chain.
//!
//! Periodic jobs are scheduled a day apart so tests drive them by hand
//! through `ValidatorServices`.

use nb_01_network_monitor::{MemoryTransport, MonitorConfig};
use nb_02_security_manager::SecurityConfig;
use nb_03_bridge_protocol::{
    AccountId, DepositInstruction, InMemoryTokenLedger, InProcessSettlement, ProgramPolicy,
    SourceEventId, SourceProof, WithdrawInstruction, UNITS_PER_NOCK,
};
use nb_04_state_store::InMemoryBackend;
use shared_crypto::Ed25519KeyPair;
use shared_types::{ManualTimeSource, PublicKey, SharedTimeSource};
use std::sync::Arc;
use validator_runtime::config::SchedulerSection;
use validator_runtime::{
    CoordinatorError, Finalization, RoundStatus, RuntimeError, RuntimeParts, ValidatorConfig,
    ValidatorRuntime,
};

/// Start of every cluster clock.
pub const T0: u64 = 1_700_000_000;

/// Account credited with bridge fees.
pub const FEE_COLLECTOR: AccountId = [0xFE; 32];

/// Rolling daily limit of every cluster, in whole NOCK.
pub const DAILY_LIMIT_NOCK: u64 = 10_000;

/// Store key shared by the cluster.
pub const STORE_KEY: [u8; 32] = [0x5E; 32];

/// One round outcome as reported by a job.
pub type RoundResult = (String, Result<RoundStatus, CoordinatorError>);

/// Signing seed of validator `index`.
pub fn validator_seed(index: usize) -> [u8; 32] {
    [index as u8 + 1; 32]
}

/// Public key of validator `index`.
pub fn validator_key(index: usize) -> PublicKey {
    *Ed25519KeyPair::from_seed(validator_seed(index))
        .public_key()
        .as_bytes()
}

/// Config of validator `index` in a `validators`-strong set.
pub fn validator_config(index: usize, validators: usize, threshold: u8) -> ValidatorConfig {
    let mut config = ValidatorConfig::default();
    config.node.name = format!("validator-{}", index + 1);
    config.node.signing_seed = hex::encode(validator_seed(index));
    config.node.listen_address = String::new();
    config.store.encryption_key = hex::encode(STORE_KEY);
    config.security = SecurityConfig::for_testing();
    config.network.monitor = MonitorConfig::for_testing();
    config.bridge.validators = (0..validators).map(|i| hex::encode(validator_key(i))).collect();
    config.bridge.threshold = threshold;
    config.bridge.daily_limit = DAILY_LIMIT_NOCK * UNITS_PER_NOCK;
    config.bridge.emergency_delay_secs = 3_600;
    config.scheduler = SchedulerSection {
        metrics_interval_secs: 86_400,
        health_check_secs: 86_400,
        alert_sweep_secs: 86_400,
        threat_gc_secs: 86_400,
        key_rotation_check_secs: 86_400,
        pending_drain_secs: 86_400,
        round_poll_secs: 86_400,
        registry_refresh_secs: 86_400,
        security_scan_secs: 86_400,
        max_drain_batch: 32,
    };
    config
}

/// Validators on shared infrastructure.
pub struct BridgeCluster {
    /// Clock of every subsystem.
    pub time: ManualTimeSource,
    /// Store backend, kept concrete for tampering.
    pub backend: Arc<InMemoryBackend>,
    /// Destination-chain program.
    pub settlement: Arc<InProcessSettlement>,
    /// Wrapped-token balances.
    pub ledger: Arc<InMemoryTokenLedger>,
    /// Peer network.
    pub transport: Arc<MemoryTransport>,
    /// Runtimes, in key order of their seeds.
    pub validators: Vec<ValidatorRuntime>,
}

impl BridgeCluster {
    /// Build `validators` runtimes with the given threshold. Nothing is
    /// started.
    pub fn build(validators: usize, threshold: u8) -> Result<Self, RuntimeError> {
        Self::build_with(validators, threshold, |_, _| {})
    }

    /// Like `build`, letting `tweak` adjust each validator's config.
    pub fn build_with<F>(validators: usize, threshold: u8, tweak: F) -> Result<Self, RuntimeError>
    where
        F: Fn(usize, &mut ValidatorConfig),
    {
        let time = ManualTimeSource::new(T0);
        let shared: SharedTimeSource = Arc::new(time.clone());
        let backend = Arc::new(InMemoryBackend::with_time_source(shared.clone()));
        let ledger = Arc::new(InMemoryTokenLedger::new());
        let settlement = Arc::new(InProcessSettlement::new(
            ProgramPolicy {
                fee_collector: FEE_COLLECTOR,
                ..ProgramPolicy::default()
            },
            ledger.clone(),
            shared.clone(),
        ));
        let transport = Arc::new(MemoryTransport::new());

        let runtimes = (0..validators)
            .map(|i| {
                let mut config = validator_config(i, validators, threshold);
                tweak(i, &mut config);
                ValidatorRuntime::with_parts(
                    config,
                    RuntimeParts {
                        time: shared.clone(),
                        transport: transport.clone(),
                        backend: backend.clone(),
                        settlement: settlement.clone(),
                    },
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            time,
            backend,
            settlement,
            ledger,
            transport,
            validators: runtimes,
        })
    }

    /// Build and start every validator.
    pub async fn start(validators: usize, threshold: u8) -> Result<Self, RuntimeError> {
        let cluster = Self::build(validators, threshold)?;
        for runtime in &cluster.validators {
            runtime.start().await?;
        }
        Ok(cluster)
    }

    /// Validator `index`.
    pub fn validator(&self, index: usize) -> &ValidatorRuntime {
        &self.validators[index]
    }

    /// One pass of the signing jobs: every validator drains the queue,
    /// then every validator polls and joins rounds.
    pub async fn run_signing_jobs(&self) -> Vec<RoundResult> {
        let mut results = Vec::new();
        for runtime in &self.validators {
            let processed = runtime.services().drain_pending().await;
            results.extend(processed.into_iter().map(|p| (p.round, p.result)));
        }
        for runtime in &self.validators {
            results.extend(runtime.services().poll_rounds().await);
        }
        results
    }

    /// Stop every validator.
    pub async fn shutdown(&self) {
        for runtime in &self.validators {
            runtime.shutdown().await;
        }
    }
}

/// Receipts of the finalized rounds in `results`.
pub fn finalizations(results: &[RoundResult]) -> Vec<Finalization> {
    results
        .iter()
        .filter_map(|(_, result)| match result {
            Ok(RoundStatus::Finalized { receipt, .. }) => Some(receipt.clone()),
            _ => None,
        })
        .collect()
}

/// A source-chain deposit of `nock` whole NOCK.
pub fn deposit(nock: u64, recipient: AccountId, log_index: u32) -> DepositInstruction {
    DepositInstruction {
        amount: nock * UNITS_PER_NOCK,
        recipient,
        proof: SourceProof {
            event: SourceEventId {
                tx_hash: [0x7C; 32],
                log_index,
            },
            source_height: 42_000,
        },
    }
}

/// A withdrawal of `nock` whole NOCK.
pub fn withdrawal(nock: u64, owner: AccountId, request: u8) -> WithdrawInstruction {
    WithdrawInstruction {
        request_id: [request; 32],
        owner,
        amount: nock * UNITS_PER_NOCK,
        destination: [0xD0; 32],
    }
}

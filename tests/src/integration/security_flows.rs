//! # Security Flow Tests
//!
//! Detection paths that start in one subsystem and end in another.
//!
//! ## Flows Tested:
//!
//! 1. **Store tampering (nb-04 → nb-02)**: a modified consensus message is
//!    dropped and raises a `data_corruption` threat
//! 2. **Peer loss (nb-01)**: an unreachable configured peer ends as a
//!    `validator_offline` alert that no sweep resolves
//! 3. **Forged co-signature (coordinator → nb-02 → nb-03)**: a critical
//!    threat locks the validator down and pauses the bridge

#[cfg(test)]
mod tests {
    use crate::fixtures::{deposit, validator_key, BridgeCluster, T0};
    use nb_01_network_monitor::{AlertType, NetworkMonitorApi};
    use nb_02_security_manager::{SecurityManagerApi, ThreatType};
    use nb_03_bridge_protocol::{SettlementProgramApi, TokenLedger};
    use shared_crypto::Ed25519KeyPair;
    use shared_types::{Severity, Timestamp, ValidatorSignature};
    use std::time::Duration;
    use validator_runtime::adapters::STORE_SOURCE;
    use validator_runtime::config::PeerEntry;
    use validator_runtime::{BridgeRequest, ConsensusMessage, Vote};

    const BOB: [u8; 32] = [0xB0; 32];

    // =============================================================================
    // STORE TAMPERING
    // =============================================================================

    #[tokio::test]
    async fn test_tampered_consensus_message_raises_data_corruption() {
        let cluster = BridgeCluster::start(3, 2).await.unwrap();
        let proposer = cluster.validator(0);
        proposer
            .coordinator()
            .observe_deposit(deposit(8, BOB, 0))
            .await
            .unwrap();
        assert_eq!(proposer.services().drain_pending().await.len(), 1);

        let round = BridgeRequest::Deposit(deposit(8, BOB, 0)).round_id();
        let key = format!("nockbridge:consensus:{round}:{}", proposer.identity().to_hex());
        assert!(cluster.backend.tamper(&key, |bytes| {
            let last = bytes.len() - 1;
            bytes[last] ^= 0x01;
        }));

        // The peer cannot read the proposal, so there is nothing to join.
        let peer = cluster.validator(1);
        assert!(peer.services().poll_rounds().await.is_empty());
        assert!(peer.coordinator().open_rounds().is_empty());

        let security = &peer.services().security;
        let mut threats = Vec::new();
        for _ in 0..50 {
            threats = security.threats().await;
            if !threats.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!threats.is_empty());
        assert!(threats.iter().all(|t| t.threat_type == ThreatType::DataCorruption
            && t.severity == Severity::High
            && t.source == STORE_SOURCE));
        assert_eq!(cluster.ledger.balance(&BOB), 0);

        cluster.shutdown().await;
    }

    // =============================================================================
    // PEER LOSS
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_peer_goes_offline() {
        let cluster = BridgeCluster::build_with(2, 1, |index, config| {
            if index == 0 {
                config.network.peers.push(PeerEntry {
                    id: "validator-2".to_string(),
                    address: "10.0.0.2:7400".to_string(),
                    public_key: hex::encode(validator_key(1)),
                });
            }
        })
        .unwrap();
        let node = cluster.validator(0);
        node.start().await.unwrap();

        // One dial plus two retries, one second apart; nobody listens.
        tokio::time::sleep(Duration::from_secs(5)).await;
        let monitor = &node.services().monitor;
        let peer = monitor.peer("validator-2").await.unwrap();
        assert!(!peer.is_connected);

        let alerts = monitor.active_alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::ValidatorOffline);
        assert_eq!(alerts[0].source, "validator-2");

        let topology = monitor.network_topology().await;
        assert_eq!(topology.total_validators, 1);
        assert_eq!(topology.connected_validators, 0);

        cluster.time.advance(10_000);
        assert_eq!(node.services().sweep_alerts().await, 0);
        assert_eq!(monitor.active_alerts().await.len(), 1);

        node.shutdown().await;
    }

    // =============================================================================
    // FORGED CO-SIGNATURE
    // =============================================================================

    #[tokio::test]
    async fn test_forged_cosignature_locks_down_and_pauses() {
        let cluster = BridgeCluster::build_with(2, 1, |_, config| {
            config.security.auto_lockdown_on_critical = true;
        })
        .unwrap();
        for runtime in &cluster.validators {
            runtime.start().await.unwrap();
        }

        // Validator 2's slot holds a signature over different bytes.
        let request = BridgeRequest::Deposit(deposit(3, BOB, 0));
        let round = request.round_id();
        let impostor = Ed25519KeyPair::from_seed([2; 32]);
        let forged = ConsensusMessage {
            round: round.clone(),
            request: request.clone(),
            vote: Vote::Approve,
            signature: ValidatorSignature::new(
                *impostor.public_key().as_bytes(),
                *impostor.sign(b"not the deposit").as_bytes(),
            ),
            timestamp: Timestamp::new(T0),
        };
        let node = cluster.validator(0);
        node.services()
            .store
            .publish_consensus_message(&round, &forged.signer(), &forged)
            .await
            .unwrap();

        node.coordinator().sign_request(request).await.unwrap();

        for _ in 0..100 {
            if cluster.settlement.state().await.unwrap().is_paused {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(cluster.settlement.state().await.unwrap().is_paused);

        let threats = node.services().security.threats().await;
        assert!(threats
            .iter()
            .any(|t| t.threat_type == ThreatType::CryptoVulnerability
                && t.severity == Severity::Critical));
        assert!(node.services().security.lockdown().await.is_some());
        let flag = node.services().store.emergency_mode().await.unwrap().unwrap();
        assert_eq!(flag.raised_by, node.identity());

        cluster.shutdown().await;
    }
}

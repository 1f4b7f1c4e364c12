//! Tests for the bridge coordinator.
//!
//! Every cluster shares one backend and one settlement program, the way
//! real validators share the store and the destination chain.

use super::*;
use nb_02_security_manager::{SecurityConfig, SecurityDependencies, SecurityManager};
use nb_03_bridge_protocol::{
    InMemoryTokenLedger, InitializeParams, InProcessSettlement, ProgramPolicy, SourceEventId,
    SourceProof, TokenLedger, UNITS_PER_NOCK,
};
use nb_04_state_store::{InMemoryBackend, StoreConfig};
use shared_crypto::SecretKey;
use shared_types::ManualTimeSource;

const T0: u64 = 1_700_000_000;
const RECIPIENT: [u8; 32] = [0xAA; 32];

struct Node {
    coordinator: BridgeCoordinator,
    security: Arc<SecurityManager>,
}

struct Cluster {
    time: ManualTimeSource,
    store: Arc<SecureStateStore>,
    settlement: Arc<InProcessSettlement>,
    ledger: Arc<InMemoryTokenLedger>,
    nodes: Vec<Node>,
}

type Shared = (ManualTimeSource, Arc<SecureStateStore>, Arc<InProcessSettlement>);

fn node(seed: u8, shared: &Shared) -> Node {
    node_with_config(seed, shared, SecurityConfig::for_testing())
}

fn node_with_config(seed: u8, shared: &Shared, config: SecurityConfig) -> Node {
    let (time, store, settlement) = shared;
    let shared_time: SharedTimeSource = Arc::new(time.clone());
    let security = Arc::new(SecurityManager::new(
        config.clone(),
        SecurityDependencies {
            time: shared_time.clone(),
            ..SecurityDependencies::standard(&config)
        },
    ));
    let coordinator = BridgeCoordinator::new(
        Ed25519KeyPair::from_seed([seed; 32]),
        CoordinatorDependencies {
            store: store.clone(),
            security: security.clone(),
            settlement: settlement.clone(),
            counters: Arc::new(SourceCounterBook::new()),
            time: shared_time,
        },
    );
    Node {
        coordinator,
        security,
    }
}

async fn cluster(validators: u8, threshold: u8) -> Cluster {
    let time = ManualTimeSource::new(T0);
    let shared_time: SharedTimeSource = Arc::new(time.clone());
    let backend = Arc::new(InMemoryBackend::with_time_source(shared_time.clone()));
    let store = Arc::new(SecureStateStore::new(
        backend,
        SecretKey::from_bytes([9; 32]),
        StoreConfig::default(),
    ));
    let ledger = Arc::new(InMemoryTokenLedger::new());
    let settlement = Arc::new(InProcessSettlement::new(
        ProgramPolicy::default(),
        ledger.clone(),
        shared_time,
    ));

    let seeds: Vec<u8> = (1..=validators).collect();
    let keys: Vec<[u8; 32]> = seeds
        .iter()
        .map(|s| *Ed25519KeyPair::from_seed([*s; 32]).public_key().as_bytes())
        .collect();
    settlement
        .initialize_bridge(InitializeParams {
            authority: [0xAD; 32],
            validators: keys,
            threshold,
            fee_rate_bps: 50,
            daily_limit: 10_000 * UNITS_PER_NOCK,
            emergency_delay_secs: 3_600,
        })
        .await
        .unwrap();

    let parts = (time.clone(), store.clone(), settlement.clone());
    let nodes = seeds.iter().map(|s| node(*s, &parts)).collect();
    Cluster {
        time,
        store,
        settlement,
        ledger,
        nodes,
    }
}

impl Cluster {
    fn coordinator(&self, i: usize) -> &BridgeCoordinator {
        &self.nodes[i].coordinator
    }
}

fn deposit(nock: u64, log_index: u32) -> DepositInstruction {
    DepositInstruction {
        amount: nock * UNITS_PER_NOCK,
        recipient: RECIPIENT,
        proof: SourceProof {
            event: SourceEventId {
                tx_hash: [0x11; 32],
                log_index,
            },
            source_height: 1_000,
        },
    }
}

fn pending(approvals: usize, threshold: u8) -> RoundStatus {
    RoundStatus::Pending {
        approvals,
        threshold,
    }
}

#[tokio::test]
async fn test_deposit_finalizes_at_threshold() {
    let c = cluster(5, 3).await;
    let request = BridgeRequest::Deposit(deposit(100, 0));
    let round = request.round_id();

    assert_eq!(
        c.coordinator(0).sign_request(request.clone()).await.unwrap(),
        pending(1, 3)
    );
    assert_eq!(
        c.coordinator(1).sign_request(request.clone()).await.unwrap(),
        pending(2, 3)
    );

    match c.coordinator(2).sign_request(request.clone()).await.unwrap() {
        RoundStatus::Finalized {
            receipt: Finalization::Deposit(receipt),
            approvals,
            validators,
        } => {
            assert_eq!(approvals, 3);
            assert_eq!(validators, 5);
            assert_eq!(receipt.net_amount, 99 * UNITS_PER_NOCK + UNITS_PER_NOCK / 2);
            assert_eq!(receipt.fee, UNITS_PER_NOCK / 2);
            assert_eq!(receipt.nonce, 1);
        }
        other => panic!("expected finalization, got {other:?}"),
    }
    assert_eq!(c.ledger.balance(&RECIPIENT), 99 * UNITS_PER_NOCK + UNITS_PER_NOCK / 2);

    // The earlier signers learn of the finalization on their next poll.
    assert_eq!(
        c.coordinator(0).poll_round(&round).await.unwrap(),
        RoundStatus::AlreadyFinalized
    );
    assert!(c.coordinator(0).open_rounds().is_empty());
    assert!(c.coordinator(2).open_rounds().is_empty());
}

#[tokio::test]
async fn test_concurrent_signers_credit_once() {
    let c = cluster(3, 2).await;
    let request = BridgeRequest::Deposit(deposit(10, 0));
    let round = request.round_id();

    let (a, b, d) = tokio::join!(
        c.coordinator(0).sign_request(request.clone()),
        c.coordinator(1).sign_request(request.clone()),
        c.coordinator(2).sign_request(request.clone()),
    );
    let mut statuses = vec![a.unwrap(), b.unwrap(), d.unwrap()];
    for node in &c.nodes {
        if node.coordinator.open_rounds().contains(&round) {
            statuses.push(node.coordinator.poll_round(&round).await.unwrap());
        }
    }

    let finalized = statuses
        .iter()
        .filter(|s| matches!(s, RoundStatus::Finalized { .. }))
        .count();
    assert_eq!(finalized, 1);
    assert_eq!(c.settlement.state().await.unwrap().nonce, 1);
    let credited = c.ledger.balance(&RECIPIENT);
    assert_eq!(credited, 10 * UNITS_PER_NOCK - 10 * UNITS_PER_NOCK / 200);

    // A late signer is told the round is done and publishes nothing.
    assert_eq!(
        c.coordinator(2).sign_request(request).await.unwrap(),
        RoundStatus::AlreadyFinalized
    );
    assert_eq!(c.ledger.balance(&RECIPIENT), credited);
}

#[tokio::test]
async fn test_claim_held_by_peer_blocks_submission() {
    let c = cluster(3, 2).await;
    let request = BridgeRequest::Deposit(deposit(5, 0));
    let round = request.round_id();

    c.coordinator(0).sign_request(request.clone()).await.unwrap();
    let claimant = c.coordinator(2).identity();
    assert!(c.store.claim_round(&round, &claimant).await.unwrap());

    assert_eq!(
        c.coordinator(1).sign_request(request).await.unwrap(),
        RoundStatus::ClaimedByPeer
    );
    assert_eq!(c.ledger.balance(&RECIPIENT), 0);
    assert_eq!(c.coordinator(1).open_rounds(), vec![round]);
}

#[tokio::test]
async fn test_emergency_flag_refuses_transfers() {
    let c = cluster(3, 2).await;
    c.coordinator(0).observe_deposit(deposit(1, 0)).await.unwrap();
    c.store
        .set_emergency_mode(&EmergencyFlag {
            reason: "source chain reorg".into(),
            raised_by: c.coordinator(1).identity(),
            raised_at: Timestamp::new(T0),
        })
        .await
        .unwrap();

    let err = c.coordinator(0).drain_pending(10).await.unwrap_err();
    assert_eq!(
        err,
        CoordinatorError::EmergencyActive("source chain reorg".into())
    );
    assert_eq!(c.store.pending_len().await.unwrap(), 1);

    let err = c
        .coordinator(0)
        .sign_request(BridgeRequest::Deposit(deposit(1, 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::EmergencyActive(_)));
    assert!(c.store.open_rounds().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_local_lockdown_refuses_transfers() {
    let c = cluster(3, 2).await;
    c.nodes[0].security.trigger_emergency_lockdown("operator").await;

    let err = c
        .coordinator(0)
        .sign_request(BridgeRequest::Deposit(deposit(1, 0)))
        .await
        .unwrap_err();
    assert_eq!(err, CoordinatorError::EmergencyActive("operator".into()));

    // Other validators are unaffected.
    assert_eq!(
        c.coordinator(1)
            .sign_request(BridgeRequest::Deposit(deposit(1, 0)))
            .await
            .unwrap(),
        pending(1, 2)
    );
}

#[tokio::test]
async fn test_bad_signature_is_not_counted() {
    let c = cluster(3, 2).await;
    let request = BridgeRequest::Deposit(deposit(7, 0));
    let round = request.round_id();

    // Validator 3's slot filled with a signature over different bytes.
    let forger = Ed25519KeyPair::from_seed([3; 32]);
    let forged = ConsensusMessage {
        round: round.clone(),
        request: request.clone(),
        vote: Vote::Approve,
        signature: ValidatorSignature::new(
            *forger.public_key().as_bytes(),
            *forger.sign(b"something else").as_bytes(),
        ),
        timestamp: Timestamp::new(T0),
    };
    c.store
        .publish_consensus_message(&round, &forged.signer(), &forged)
        .await
        .unwrap();

    assert_eq!(
        c.coordinator(0).sign_request(request.clone()).await.unwrap(),
        pending(1, 2)
    );
    let threats = c.nodes[0].security.threats().await;
    let crypto: Vec<_> = threats
        .iter()
        .filter(|t| t.threat_type == ThreatType::CryptoVulnerability)
        .collect();
    assert_eq!(crypto.len(), 1);
    assert_eq!(crypto[0].severity, Severity::Critical);

    // Re-polling does not report the same signature twice.
    assert_eq!(c.coordinator(0).poll_round(&round).await.unwrap(), pending(1, 2));
    let again = c.nodes[0].security.threats().await;
    assert_eq!(
        again
            .iter()
            .filter(|t| t.threat_type == ThreatType::CryptoVulnerability)
            .count(),
        1
    );
    assert_eq!(c.ledger.balance(&RECIPIENT), 0);
}

#[tokio::test]
async fn test_rejected_transaction_publishes_reject_vote() {
    let c = cluster(3, 2).await;
    let request = BridgeRequest::Deposit(deposit(3, 0));
    let round = request.round_id();
    let source = format!("account:{}", hex::encode(RECIPIENT));
    c.nodes[0]
        .security
        .detect_threat(
            ThreatType::UnauthorizedAccess,
            Severity::Medium,
            &source,
            serde_json::Value::Null,
        )
        .await;

    let err = c.coordinator(0).sign_request(request.clone()).await.unwrap_err();
    match err {
        CoordinatorError::Rejected { score, findings } => {
            assert_eq!(score, 0);
            assert_eq!(findings, vec!["source quarantined".to_string()]);
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    let messages: Vec<ConsensusMessage> = c.store.consensus_messages(&round).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert!(matches!(messages[0].vote, Vote::Reject { .. }));
    assert!(c.coordinator(0).open_rounds().is_empty());

    // The reject vote is not an approval.
    assert_eq!(
        c.coordinator(1).sign_request(request).await.unwrap(),
        pending(1, 2)
    );
}

#[tokio::test]
async fn test_emergency_pause_flow() {
    let c = cluster(3, 2).await;
    c.coordinator(2).observe_deposit(deposit(1, 0)).await.unwrap();

    assert_eq!(
        c.coordinator(0)
            .propose_emergency_pause("bridge drained on source chain")
            .await
            .unwrap(),
        pending(1, 2)
    );
    let flag = c.store.emergency_mode().await.unwrap().unwrap();
    assert_eq!(flag.raised_by, c.coordinator(0).identity());

    // Transfers stop while the pause collects signatures.
    assert!(matches!(
        c.coordinator(2).drain_pending(10).await,
        Err(CoordinatorError::EmergencyActive(_))
    ));

    match c
        .coordinator(1)
        .propose_emergency_pause("second opinion")
        .await
        .unwrap()
    {
        RoundStatus::Finalized {
            receipt: Finalization::Pause(receipt),
            approvals,
            ..
        } => {
            assert_eq!(approvals, 2);
            assert_eq!(receipt.nonce, 1);
        }
        other => panic!("expected pause, got {other:?}"),
    }
    // The first flag is kept.
    assert_eq!(
        c.store.emergency_mode().await.unwrap().unwrap().reason,
        "bridge drained on source chain"
    );
    assert!(c.settlement.state().await.unwrap().is_paused);
    assert_eq!(
        c.coordinator(2).propose_emergency_pause("late").await.unwrap(),
        RoundStatus::AlreadyFinalized
    );
    assert_eq!(
        c.coordinator(0).poll_round("pause-0").await.unwrap(),
        RoundStatus::AlreadyFinalized
    );
}

#[tokio::test]
async fn test_round_expires_below_threshold() {
    let c = cluster(3, 2).await;
    let request = BridgeRequest::Deposit(deposit(2, 0));
    let round = request.round_id();
    c.coordinator(0).sign_request(request).await.unwrap();
    assert_eq!(c.coordinator(0).round_age(&round), Some(0));

    c.time.advance(60 * 60 + 1);
    assert_eq!(
        c.coordinator(0).poll_open_rounds().await,
        vec![(round.clone(), Ok(RoundStatus::Expired))]
    );
    assert!(c.coordinator(0).open_rounds().is_empty());
    assert_eq!(
        c.coordinator(0).poll_round(&round).await,
        Err(CoordinatorError::UnknownRound(round))
    );
}

#[tokio::test]
async fn test_drain_respects_batch_size() {
    let c = cluster(3, 2).await;
    for i in 0..3 {
        let len = c.coordinator(0).observe_deposit(deposit(1, i)).await.unwrap();
        assert_eq!(len, i as usize + 1);
    }

    let processed = c.coordinator(1).drain_pending(2).await.unwrap();
    assert_eq!(processed.len(), 2);
    assert_eq!(
        processed[0].round,
        BridgeRequest::Deposit(deposit(1, 0)).round_id()
    );
    assert!(processed.iter().all(|p| p.result == Ok(pending(1, 2))));
    assert_eq!(c.store.pending_len().await.unwrap(), 1);
    assert_eq!(c.coordinator(1).open_rounds().len(), 2);
}

#[tokio::test]
async fn test_outsider_cannot_sign() {
    let c = cluster(3, 2).await;
    let parts = (c.time.clone(), c.store.clone(), c.settlement.clone());
    let outsider = node(42, &parts);

    let err = outsider
        .coordinator
        .sign_request(BridgeRequest::Deposit(deposit(1, 0)))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CoordinatorError::NotAValidator(outsider.coordinator.identity())
    );
}

#[tokio::test]
async fn test_peers_join_round_from_shared_queue() {
    let c = cluster(5, 3).await;
    c.coordinator(4).observe_deposit(deposit(20, 0)).await.unwrap();
    let round = BridgeRequest::Deposit(deposit(20, 0)).round_id();

    let drained = c.coordinator(0).drain_pending(10).await.unwrap();
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].result, Ok(pending(1, 3)));
    assert_eq!(c.store.pending_len().await.unwrap(), 0);

    // The proposer does not join its own round.
    assert!(c.coordinator(0).join_open_rounds().await.unwrap().is_empty());

    let joined = c.coordinator(1).join_open_rounds().await.unwrap();
    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0].round, round);
    assert_eq!(joined[0].result, Ok(pending(2, 3)));
    // Joining once is enough; the round is now tracked locally.
    assert!(c.coordinator(1).join_open_rounds().await.unwrap().is_empty());
    assert_eq!(c.coordinator(1).open_rounds(), vec![round.clone()]);

    let joined = c.coordinator(2).join_open_rounds().await.unwrap();
    assert!(matches!(
        joined[0].result,
        Ok(RoundStatus::Finalized { approvals: 3, .. })
    ));
    let credited = 20 * UNITS_PER_NOCK - 20 * UNITS_PER_NOCK / 200;
    assert_eq!(c.ledger.balance(&RECIPIENT), credited);

    // Late validators find nothing left to sign.
    assert!(c.coordinator(3).join_open_rounds().await.unwrap().is_empty());
    assert_eq!(c.ledger.balance(&RECIPIENT), credited);
    assert_eq!(c.settlement.state().await.unwrap().nonce, 1);
}

#[tokio::test]
async fn test_forged_proposal_is_not_joined() {
    let c = cluster(3, 2).await;
    let request = BridgeRequest::Deposit(deposit(9, 0));
    let round = request.round_id();

    // An outsider's approval is never a reason to sign.
    let outsider = Ed25519KeyPair::from_seed([42; 32]);
    let proposal = ConsensusMessage {
        round: round.clone(),
        request: request.clone(),
        vote: Vote::Approve,
        signature: ValidatorSignature::new(
            *outsider.public_key().as_bytes(),
            *outsider.sign(&request.message()).as_bytes(),
        ),
        timestamp: Timestamp::new(T0),
    };
    c.store
        .publish_consensus_message(&round, &proposal.signer(), &proposal)
        .await
        .unwrap();

    assert!(c.coordinator(0).join_open_rounds().await.unwrap().is_empty());
    assert!(c.coordinator(0).open_rounds().is_empty());
    assert_eq!(c.store.consensus_messages::<ConsensusMessage>(&round).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_outsider_drain_leaves_queue_intact() {
    let c = cluster(3, 2).await;
    let parts = (c.time.clone(), c.store.clone(), c.settlement.clone());
    let outsider = node(42, &parts);
    c.coordinator(0).observe_deposit(deposit(6, 0)).await.unwrap();

    assert_eq!(
        outsider.coordinator.drain_pending(10).await.unwrap_err(),
        CoordinatorError::NotAValidator(outsider.coordinator.identity())
    );
    assert_eq!(c.store.pending_len().await.unwrap(), 1);

    let drained = c.coordinator(1).drain_pending(10).await.unwrap();
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].result, Ok(pending(1, 2)));
}

#[tokio::test]
async fn test_lockdown_mid_drain_requeues_request() {
    let c = cluster(3, 2).await;
    let parts = (c.time.clone(), c.store.clone(), c.settlement.clone());
    let guarded = node_with_config(
        1,
        &parts,
        SecurityConfig {
            auto_lockdown_on_critical: true,
            ..SecurityConfig::for_testing()
        },
    );

    // A bad co-signature in the first round raises a critical threat.
    let first = BridgeRequest::Deposit(deposit(4, 0));
    let round = first.round_id();
    let forger = Ed25519KeyPair::from_seed([3; 32]);
    let forged = ConsensusMessage {
        round: round.clone(),
        request: first,
        vote: Vote::Approve,
        signature: ValidatorSignature::new(
            *forger.public_key().as_bytes(),
            *forger.sign(b"not the deposit").as_bytes(),
        ),
        timestamp: Timestamp::new(T0),
    };
    c.store
        .publish_consensus_message(&round, &forged.signer(), &forged)
        .await
        .unwrap();
    c.coordinator(2).observe_deposit(deposit(4, 0)).await.unwrap();
    c.coordinator(2).observe_deposit(deposit(4, 1)).await.unwrap();

    let drained = guarded.coordinator.drain_pending(10).await.unwrap();
    assert_eq!(drained.len(), 2);
    assert_eq!(drained[0].result, Ok(pending(1, 2)));
    assert!(matches!(
        drained[1].result,
        Err(CoordinatorError::EmergencyActive(_))
    ));
    assert!(guarded.security.lockdown().await.is_some());

    // The second deposit is back in the queue for the rest of the set.
    assert_eq!(c.store.pending_len().await.unwrap(), 1);
    let drained = c.coordinator(1).drain_pending(10).await.unwrap();
    assert_eq!(drained.len(), 1);
    assert_eq!(
        drained[0].round,
        BridgeRequest::Deposit(deposit(4, 1)).round_id()
    );
    assert_eq!(drained[0].result, Ok(pending(1, 2)));
}

#[tokio::test]
async fn test_rejection_in_drain_is_not_requeued() {
    let c = cluster(3, 2).await;
    let source = format!("account:{}", hex::encode(RECIPIENT));
    c.nodes[0]
        .security
        .detect_threat(
            ThreatType::UnauthorizedAccess,
            Severity::Medium,
            &source,
            serde_json::Value::Null,
        )
        .await;
    c.coordinator(0).observe_deposit(deposit(8, 0)).await.unwrap();

    let drained = c.coordinator(0).drain_pending(10).await.unwrap();
    assert_eq!(drained.len(), 1);
    assert!(matches!(
        drained[0].result,
        Err(CoordinatorError::Rejected { .. })
    ));
    // The reject vote is in the store, so the request is not queued again.
    assert_eq!(c.store.pending_len().await.unwrap(), 0);
    assert_eq!(c.store.open_rounds().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_peer_rejection_is_not_a_veto() {
    let c = cluster(3, 2).await;
    let source = format!("account:{}", hex::encode(RECIPIENT));
    c.nodes[0]
        .security
        .detect_threat(
            ThreatType::UnauthorizedAccess,
            Severity::Medium,
            &source,
            serde_json::Value::Null,
        )
        .await;
    c.coordinator(2).observe_deposit(deposit(15, 0)).await.unwrap();
    let round = BridgeRequest::Deposit(deposit(15, 0)).round_id();

    let drained = c.coordinator(0).drain_pending(10).await.unwrap();
    assert!(matches!(
        drained[0].result,
        Err(CoordinatorError::Rejected { .. })
    ));
    assert!(c.coordinator(0).join_open_rounds().await.unwrap().is_empty());

    // The others screen the request themselves and carry it.
    let joined = c.coordinator(1).join_open_rounds().await.unwrap();
    assert_eq!(joined.len(), 1);
    assert_eq!(joined[0].round, round);
    assert_eq!(joined[0].result, Ok(pending(1, 2)));

    let joined = c.coordinator(2).join_open_rounds().await.unwrap();
    assert!(matches!(
        joined[0].result,
        Ok(RoundStatus::Finalized { approvals: 2, .. })
    ));
    assert_eq!(
        c.ledger.balance(&RECIPIENT),
        15 * UNITS_PER_NOCK - 15 * UNITS_PER_NOCK / 200
    );
    assert_eq!(c.settlement.state().await.unwrap().nonce, 1);
}

#[tokio::test]
async fn test_forged_reject_vote_is_not_joined() {
    let c = cluster(3, 2).await;
    let request = BridgeRequest::Deposit(deposit(9, 1));
    let round = request.round_id();

    // Validator 3's key, but signed over the approval bytes.
    let signer = Ed25519KeyPair::from_seed([3; 32]);
    let vote = ConsensusMessage {
        round: round.clone(),
        request: request.clone(),
        vote: Vote::Reject {
            reason: "spoofed".into(),
        },
        signature: ValidatorSignature::new(
            *signer.public_key().as_bytes(),
            *signer.sign(&request.message()).as_bytes(),
        ),
        timestamp: Timestamp::new(T0),
    };
    c.store
        .publish_consensus_message(&round, &vote.signer(), &vote)
        .await
        .unwrap();

    assert!(c.coordinator(0).join_open_rounds().await.unwrap().is_empty());
    assert!(c.coordinator(0).open_rounds().is_empty());
}

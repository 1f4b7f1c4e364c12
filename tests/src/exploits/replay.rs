//! # Signature Replay Exploits
//!
//! Attacks that reuse valid signatures outside the context they were made
//! for. The settlement program is the last line of defense, so most of
//! these go straight at it with signatures harvested from the shared store.
//!
//! | Attack | Defense |
//! |--------|---------|
//! | Resubmit a finalized deposit | consumed source event set |
//! | Count a reject vote as an approval | reject votes sign a separate domain |
//! | Submit one signer twice | signers are deduplicated |
//! | Replay pause signatures later | admin messages bind the program nonce |

#[cfg(test)]
mod tests {
    use crate::fixtures::{deposit, finalizations, validator_seed, BridgeCluster};
    use nb_02_security_manager::{SecurityManagerApi, ThreatType};
    use nb_03_bridge_protocol::{
        deposit_message, pause_message, ProgramError, SettlementProgramApi, TokenLedger,
    };
    use shared_crypto::Ed25519KeyPair;
    use shared_types::{Severity, ValidatorSignature};
    use validator_runtime::{BridgeRequest, ConsensusMessage, CoordinatorError, Finalization, Vote};

    const MALLORY: [u8; 32] = [0x3A; 32];

    fn sign_as(index: usize, message: &[u8]) -> ValidatorSignature {
        let keypair = Ed25519KeyPair::from_seed(validator_seed(index));
        ValidatorSignature::new(
            *keypair.public_key().as_bytes(),
            *keypair.sign(message).as_bytes(),
        )
    }

    // =============================================================================
    // ATTACK: Resubmit a finalized deposit
    // =============================================================================

    #[tokio::test]
    async fn test_replayed_deposit_is_refused() {
        let cluster = BridgeCluster::start(3, 2).await.unwrap();
        let ix = deposit(50, MALLORY, 0);
        cluster
            .validator(0)
            .coordinator()
            .observe_deposit(ix.clone())
            .await
            .unwrap();
        assert_eq!(finalizations(&cluster.run_signing_jobs().await).len(), 1);
        let credited = cluster.ledger.balance(&MALLORY);

        // Harvest the approvals still sitting in the store.
        let round = BridgeRequest::Deposit(ix.clone()).round_id();
        let messages: Vec<ConsensusMessage> = cluster
            .validator(2)
            .services()
            .store
            .consensus_messages(&round)
            .await
            .unwrap();
        let signatures: Vec<ValidatorSignature> = messages
            .iter()
            .filter(|m| m.vote == Vote::Approve)
            .map(|m| m.signature)
            .collect();
        assert_eq!(signatures.len(), 2);

        let err = cluster
            .settlement
            .deposit_nock(ix.clone(), signatures)
            .await
            .unwrap_err();
        assert!(matches!(err, ProgramError::SourceEventConsumed(_)));

        // Re-queueing the same source event gets nowhere either.
        cluster
            .validator(1)
            .coordinator()
            .observe_deposit(ix)
            .await
            .unwrap();
        assert!(finalizations(&cluster.run_signing_jobs().await).is_empty());

        assert_eq!(cluster.ledger.balance(&MALLORY), credited);
        assert_eq!(cluster.settlement.state().await.unwrap().nonce, 1);
        cluster.shutdown().await;
    }

    // =============================================================================
    // ATTACK: Count a reject vote as an approval
    // =============================================================================

    #[tokio::test]
    async fn test_reject_vote_is_not_an_approval() {
        let cluster = BridgeCluster::start(3, 2).await.unwrap();
        let refuser = cluster.validator(0);
        let source = format!("account:{}", hex::encode(MALLORY));
        refuser
            .services()
            .security
            .detect_threat(
                ThreatType::UnauthorizedAccess,
                Severity::Medium,
                &source,
                serde_json::Value::Null,
            )
            .await;

        let ix = deposit(20, MALLORY, 0);
        refuser
            .coordinator()
            .observe_deposit(ix.clone())
            .await
            .unwrap();
        let processed = refuser.services().drain_pending().await;
        assert!(matches!(
            processed[0].result,
            Err(CoordinatorError::Rejected { .. })
        ));

        let round = BridgeRequest::Deposit(ix.clone()).round_id();
        let messages: Vec<ConsensusMessage> = refuser
            .services()
            .store
            .consensus_messages(&round)
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0].vote, Vote::Reject { .. }));

        // Paired with one honest approval, the reject signature counts for nothing.
        let honest = sign_as(1, &deposit_message(&ix));
        let err = cluster
            .settlement
            .deposit_nock(ix, vec![messages[0].signature, honest])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProgramError::InsufficientSignatures {
                valid: 1,
                required: 2
            }
        );
        assert_eq!(cluster.ledger.balance(&MALLORY), 0);

        // The other two screen the deposit themselves and finalize it on
        // their own approvals.
        let results = cluster.run_signing_jobs().await;
        match finalizations(&results).as_slice() {
            [Finalization::Deposit(receipt)] => {
                assert_eq!(receipt.nonce, 1);
                assert_eq!(cluster.ledger.balance(&MALLORY), receipt.net_amount);
            }
            other => panic!("expected one deposit receipt, got {other:?}"),
        }
        cluster.shutdown().await;
    }

    // =============================================================================
    // ATTACK: Submit one signer twice
    // =============================================================================

    #[tokio::test]
    async fn test_duplicate_signer_counts_once() {
        let cluster = BridgeCluster::start(3, 2).await.unwrap();
        let ix = deposit(5, MALLORY, 7);
        let signature = sign_as(2, &deposit_message(&ix));

        let err = cluster
            .settlement
            .deposit_nock(ix, vec![signature, signature, signature])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProgramError::InsufficientSignatures {
                valid: 1,
                required: 2
            }
        );
        assert_eq!(cluster.settlement.state().await.unwrap().nonce, 0);
        cluster.shutdown().await;
    }

    // =============================================================================
    // ATTACK: Replay pause signatures after the nonce moved
    // =============================================================================

    #[tokio::test]
    async fn test_stale_pause_signatures_are_refused() {
        let cluster = BridgeCluster::start(3, 2).await.unwrap();
        let stale = vec![sign_as(0, &pause_message(0)), sign_as(1, &pause_message(0))];

        cluster
            .validator(0)
            .coordinator()
            .observe_deposit(deposit(1, MALLORY, 0))
            .await
            .unwrap();
        assert_eq!(finalizations(&cluster.run_signing_jobs().await).len(), 1);

        let err = cluster.settlement.emergency_pause(stale).await.unwrap_err();
        assert_eq!(
            err,
            ProgramError::InsufficientSignatures {
                valid: 0,
                required: 2
            }
        );
        let state = cluster.settlement.state().await.unwrap();
        assert!(!state.is_paused);
        assert_eq!(state.nonce, 1);
        cluster.shutdown().await;
    }
}

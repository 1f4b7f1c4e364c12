//! # Bridge Flow Tests
//!
//! Transfers through the full validator stack: a request enters one
//! validator's queue, peers discover the round in the shared store,
//! screen it, co-sign it, and exactly one of them finalizes it on the
//! settlement program.
//!
//! ## Flows Tested:
//!
//! 1. **Deposit**: lock on Nockchain → wrapped tokens credited minus fee
//! 2. **Withdrawal**: wrapped tokens burned → release recorded
//! 3. **Daily limit**: rolling 24 h volume cap across finalized transfers
//! 4. **Emergency pause**: local lockdown → shared flag → paused program

#[cfg(test)]
mod tests {
    use crate::fixtures::{
        deposit, finalizations, withdrawal, BridgeCluster, RoundResult, DAILY_LIMIT_NOCK,
        FEE_COLLECTOR,
    };
    use nb_02_security_manager::SecurityManagerApi;
    use nb_03_bridge_protocol::{
        ProgramError, SettlementProgramApi, TokenLedger, DAY_SECS, UNITS_PER_NOCK,
    };
    use validator_runtime::{CoordinatorError, Finalization};

    const ALICE: [u8; 32] = [0xA1; 32];

    fn program_errors(results: &[RoundResult]) -> Vec<ProgramError> {
        results
            .iter()
            .filter_map(|(_, r)| match r {
                Err(CoordinatorError::Program(e)) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    // =============================================================================
    // DEPOSITS
    // =============================================================================

    #[tokio::test]
    async fn test_deposit_credits_net_amount_once() {
        let cluster = BridgeCluster::start(3, 2).await.unwrap();
        cluster
            .validator(0)
            .coordinator()
            .observe_deposit(deposit(100, ALICE, 0))
            .await
            .unwrap();

        let results = cluster.run_signing_jobs().await;
        let receipts = finalizations(&results);
        assert_eq!(receipts.len(), 1);
        match &receipts[0] {
            Finalization::Deposit(receipt) => {
                assert_eq!(receipt.amount, 100 * UNITS_PER_NOCK);
                assert_eq!(receipt.fee, UNITS_PER_NOCK / 2);
                assert_eq!(receipt.net_amount, 99 * UNITS_PER_NOCK + UNITS_PER_NOCK / 2);
                assert_eq!(receipt.nonce, 1);
            }
            other => panic!("expected deposit receipt, got {other:?}"),
        }

        assert_eq!(
            cluster.ledger.balance(&ALICE),
            99 * UNITS_PER_NOCK + UNITS_PER_NOCK / 2
        );
        assert_eq!(cluster.ledger.balance(&FEE_COLLECTOR), UNITS_PER_NOCK / 2);

        // Later passes settle the stragglers without a second credit.
        let again = cluster.run_signing_jobs().await;
        assert!(finalizations(&again).is_empty());
        assert_eq!(cluster.settlement.state().await.unwrap().nonce, 1);
        assert!(cluster.validators.iter().all(|v| v.coordinator().open_rounds().is_empty()));

        cluster.shutdown().await;
    }

    #[tokio::test]
    async fn test_queued_deposits_finalize_in_one_pass() {
        let cluster = BridgeCluster::start(5, 3).await.unwrap();
        for i in 0..3 {
            cluster
                .validator(4)
                .coordinator()
                .observe_deposit(deposit(10, ALICE, i))
                .await
                .unwrap();
        }

        let results = cluster.run_signing_jobs().await;
        assert_eq!(finalizations(&results).len(), 3);
        assert_eq!(cluster.settlement.state().await.unwrap().nonce, 3);
        assert_eq!(
            cluster.ledger.balance(&ALICE),
            3 * (10 * UNITS_PER_NOCK - 10 * UNITS_PER_NOCK / 200)
        );

        cluster.shutdown().await;
    }

    // =============================================================================
    // WITHDRAWALS
    // =============================================================================

    #[tokio::test]
    async fn test_withdrawal_burns_wrapped_tokens() {
        let cluster = BridgeCluster::start(3, 2).await.unwrap();
        let coordinator = cluster.validator(1).coordinator();
        coordinator
            .observe_deposit(deposit(100, ALICE, 0))
            .await
            .unwrap();
        cluster.run_signing_jobs().await;

        coordinator
            .observe_withdrawal(withdrawal(40, ALICE, 1))
            .await
            .unwrap();
        let results = cluster.run_signing_jobs().await;
        match finalizations(&results).as_slice() {
            [Finalization::Withdrawal(receipt)] => {
                assert_eq!(receipt.amount, 40 * UNITS_PER_NOCK);
                assert_eq!(receipt.fee, UNITS_PER_NOCK / 5);
                assert_eq!(receipt.net_amount, 40 * UNITS_PER_NOCK - UNITS_PER_NOCK / 5);
                assert_eq!(receipt.destination, [0xD0; 32]);
                assert_eq!(receipt.nonce, 2);
            }
            other => panic!("expected one withdrawal receipt, got {other:?}"),
        }

        assert_eq!(
            cluster.ledger.balance(&ALICE),
            59 * UNITS_PER_NOCK + UNITS_PER_NOCK / 2
        );
        assert_eq!(
            cluster.ledger.balance(&FEE_COLLECTOR),
            UNITS_PER_NOCK / 2 + UNITS_PER_NOCK / 5
        );

        cluster.shutdown().await;
    }

    #[tokio::test]
    async fn test_withdrawal_beyond_balance_is_refused() {
        let cluster = BridgeCluster::start(3, 2).await.unwrap();
        cluster
            .validator(0)
            .coordinator()
            .observe_withdrawal(withdrawal(1, ALICE, 9))
            .await
            .unwrap();

        let results = cluster.run_signing_jobs().await;
        assert!(finalizations(&results).is_empty());
        assert!(matches!(
            program_errors(&results).as_slice(),
            [ProgramError::InsufficientBalance { needed, available: 0 }] if *needed == UNITS_PER_NOCK
        ));
        assert_eq!(cluster.settlement.state().await.unwrap().nonce, 0);

        cluster.shutdown().await;
    }

    // =============================================================================
    // DAILY LIMIT
    // =============================================================================

    #[tokio::test]
    async fn test_daily_limit_holds_until_window_rolls() {
        let cluster = BridgeCluster::start(3, 2).await.unwrap();
        let coordinator = cluster.validator(0).coordinator();
        let big = DAILY_LIMIT_NOCK * 6 / 10;
        coordinator
            .observe_deposit(deposit(big, ALICE, 0))
            .await
            .unwrap();
        assert_eq!(finalizations(&cluster.run_signing_jobs().await).len(), 1);
        let credited = cluster.ledger.balance(&ALICE);

        coordinator
            .observe_deposit(deposit(big, ALICE, 1))
            .await
            .unwrap();
        let results = cluster.run_signing_jobs().await;
        assert!(finalizations(&results).is_empty());
        match program_errors(&results).as_slice() {
            [ProgramError::DailyLimitExceeded {
                window_volume,
                amount,
                limit,
            }] => {
                assert_eq!(*window_volume, big * UNITS_PER_NOCK);
                assert_eq!(*amount, big * UNITS_PER_NOCK);
                assert_eq!(*limit, DAILY_LIMIT_NOCK * UNITS_PER_NOCK);
            }
            other => panic!("expected one daily limit error, got {other:?}"),
        }
        assert_eq!(cluster.ledger.balance(&ALICE), credited);

        // A day later the window is empty again.
        cluster.time.advance(DAY_SECS + 1);
        coordinator
            .observe_deposit(deposit(big, ALICE, 2))
            .await
            .unwrap();
        assert_eq!(finalizations(&cluster.run_signing_jobs().await).len(), 1);
        assert_eq!(cluster.ledger.balance(&ALICE), 2 * credited);

        cluster.shutdown().await;
    }

    // =============================================================================
    // EMERGENCY PAUSE
    // =============================================================================

    #[tokio::test]
    async fn test_lockdown_pauses_bridge_and_holds_queue() {
        let cluster = BridgeCluster::start(3, 2).await.unwrap();
        let first = cluster.validator(0);
        first
            .services()
            .security
            .trigger_emergency_lockdown("source chain halted")
            .await;

        // The lockdown listener raises the shared flag and opens a pause round.
        let pause_round = "pause-0".to_string();
        for _ in 0..100 {
            if first.coordinator().open_rounds().contains(&pause_round) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(first.coordinator().open_rounds(), vec![pause_round]);
        let flag = first.services().store.emergency_mode().await.unwrap().unwrap();
        assert_eq!(flag.reason, "source chain halted");
        assert_eq!(flag.raised_by, first.identity());

        cluster
            .validator(1)
            .coordinator()
            .observe_deposit(deposit(5, ALICE, 0))
            .await
            .unwrap();

        let results = cluster.run_signing_jobs().await;
        match finalizations(&results).as_slice() {
            [Finalization::Pause(receipt)] => {
                assert_eq!(receipt.nonce, 1);
                assert_eq!(receipt.signers.len(), 2);
            }
            other => panic!("expected one pause receipt, got {other:?}"),
        }
        let state = cluster.settlement.state().await.unwrap();
        assert!(state.is_paused);
        assert_eq!(state.total_locked, 0);

        // The deposit waits in the queue.
        assert_eq!(first.services().store.pending_len().await.unwrap(), 1);
        assert_eq!(cluster.ledger.balance(&ALICE), 0);

        cluster.shutdown().await;
    }
}

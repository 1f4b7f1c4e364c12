//! # Bridge Coordinator
//!
//! Drives one validator's side of every signing round.
//!
//! ```text
//! observe_deposit / observe_withdrawal
//!        │ pending FIFO (shared store)
//!        ↓
//! drain_pending ──emergency flag / lockdown / not a validator──→ refused,
//!        │                                              item stays queued
//!        ↓ validate_transaction_security
//! sign ──→ publish ConsensusMessage (consensus:<round>:<validator>)
//!        │
//!        ↓ poll_round (scheduler)        join_open_rounds: vote on rounds
//!        │                                peers approved or rejected
//! count approvals from current validators that pass
//! validate_validator_security ──≥ threshold──→ claim ──→ finalize
//! ```
//!
//! The pending FIFO is shared, so one validator dequeues each request and
//! the others reach it through `join_open_rounds`.
//!
//! A `SourceEventConsumed` rejection means another validator won the race
//! and is reported as `AlreadyFinalized`. Rounds below threshold stay open
//! until their messages expire from the store.

mod messages;

pub use messages::{
    vote_message, BridgeRequest, ConsensusMessage, Finalization, RoundStatus, Vote,
    REJECT_DOMAIN,
};

use crate::adapters::SourceCounterBook;
use bridge_telemetry::{metric_inc, INSTRUCTIONS_FINALIZED, ROUNDS_OPEN, SIGNATURE_FAILURES};
use nb_02_security_manager::{SecurityManagerApi, ThreatType, ValidatorAttestation};
use nb_03_bridge_protocol::{
    BridgeStateView, DepositInstruction, ProgramError, SettlementProgramApi, WithdrawInstruction,
};
use nb_04_state_store::{EmergencyFlag, SecureStateStore, StoreError};
use parking_lot::Mutex;
use serde_json::json;
use shared_crypto::{verify_signature, Ed25519KeyPair};
use shared_types::{
    Severity, SharedTimeSource, Signature, Timestamp, ValidatorId, ValidatorSignature,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Coordinator errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    /// The emergency flag is set; transfers are not signed.
    #[error("Emergency mode active: {0}")]
    EmergencyActive(String),

    /// The security manager refused the transaction.
    #[error("Security check rejected transaction (score {score}): {findings:?}")]
    Rejected {
        /// Transaction score.
        score: i32,
        /// Deductions.
        findings: Vec<String>,
    },

    /// This validator is not in the program's validator set.
    #[error("Validator {0} is not in the current validator set")]
    NotAValidator(ValidatorId),

    /// Round not opened by this validator.
    #[error("Unknown round {0}")]
    UnknownRound(String),

    /// Shared store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Settlement program rejected the finalize instruction.
    #[error(transparent)]
    Program(#[from] ProgramError),
}

/// Result of handling one pending item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    /// Round of the item.
    pub round: String,
    /// Round status, or why the item was refused.
    pub result: Result<RoundStatus, CoordinatorError>,
}

/// Verdict cached per signer so each signature is checked (and each bad
/// one reported) once.
type Verdicts = HashMap<ValidatorId, (Signature, bool)>;

struct OpenRound {
    request: BridgeRequest,
    opened_at: Timestamp,
    verdicts: Verdicts,
}

/// Collaborators of the coordinator.
pub struct CoordinatorDependencies {
    /// Shared state store.
    pub store: Arc<SecureStateStore>,
    /// Local security manager.
    pub security: Arc<dyn SecurityManagerApi>,
    /// Settlement program.
    pub settlement: Arc<dyn SettlementProgramApi>,
    /// Counters fed to the periodic security scan.
    pub counters: Arc<SourceCounterBook>,
    /// Clock.
    pub time: SharedTimeSource,
}

/// One validator's bridge coordinator.
pub struct BridgeCoordinator {
    identity: ValidatorId,
    keypair: Ed25519KeyPair,
    deps: CoordinatorDependencies,
    open: Mutex<HashMap<String, OpenRound>>,
}

impl BridgeCoordinator {
    /// Coordinator signing with `keypair`.
    pub fn new(keypair: Ed25519KeyPair, deps: CoordinatorDependencies) -> Self {
        let identity = ValidatorId::from_public_key(*keypair.public_key().as_bytes());
        Self {
            identity,
            keypair,
            deps,
            open: Mutex::new(HashMap::new()),
        }
    }

    /// This validator's id.
    pub fn identity(&self) -> ValidatorId {
        self.identity
    }

    /// Rounds this validator published and has not closed, sorted.
    pub fn open_rounds(&self) -> Vec<String> {
        let mut rounds: Vec<String> = self.open.lock().keys().cloned().collect();
        rounds.sort();
        rounds
    }

    // =========================================================================
    // OBSERVATION
    // =========================================================================

    /// Queue a source-chain lock event. Returns the queue length.
    pub async fn observe_deposit(&self, ix: DepositInstruction) -> Result<usize, CoordinatorError> {
        debug!("[coordinator] Observed deposit {}", ix.proof.event);
        Ok(self
            .deps
            .store
            .enqueue_pending(&BridgeRequest::Deposit(ix))
            .await?)
    }

    /// Queue a withdrawal request. Returns the queue length.
    pub async fn observe_withdrawal(
        &self,
        ix: WithdrawInstruction,
    ) -> Result<usize, CoordinatorError> {
        debug!(
            "[coordinator] Observed withdrawal {}",
            hex::encode(ix.request_id)
        );
        Ok(self
            .deps
            .store
            .enqueue_pending(&BridgeRequest::Withdrawal(ix))
            .await?)
    }

    /// Handle up to `max` queued requests.
    ///
    /// Nothing is dequeued while the emergency flag or a local lockdown is
    /// set, or when this node is not in the validator set. A request
    /// refused before this validator voted on it goes back to the queue
    /// and ends the drain; once a vote is published, peers reach the round
    /// through `join_open_rounds`.
    pub async fn drain_pending(&self, max: usize) -> Result<Vec<Processed>, CoordinatorError> {
        self.ensure_no_emergency().await?;
        let state = self.deps.settlement.state().await?;
        if !state.is_validator(&self.identity) {
            return Err(CoordinatorError::NotAValidator(self.identity));
        }

        let mut processed = Vec::new();
        while processed.len() < max {
            let Some(request) = self.deps.store.dequeue_pending::<BridgeRequest>().await? else {
                break;
            };
            let round = request.round_id();
            let result = self.sign_request(request.clone()).await;
            let requeue = match &result {
                Ok(_) => false,
                Err(e) => {
                    warn!("[coordinator] Round {} refused: {}", round, e);
                    self.refused_before_vote(&round, e)
                }
            };
            processed.push(Processed { round, result });
            if requeue {
                if let Err(e) = self.deps.store.enqueue_pending(&request).await {
                    warn!("[coordinator] Could not requeue {}: {}", request.round_id(), e);
                }
                break;
            }
        }
        Ok(processed)
    }

    /// Whether `error` stopped this validator before it published a vote
    /// on `round`, leaving no trace of the request in the store.
    fn refused_before_vote(&self, round: &str, error: &CoordinatorError) -> bool {
        match error {
            CoordinatorError::Rejected { .. } | CoordinatorError::UnknownRound(_) => false,
            CoordinatorError::EmergencyActive(_) | CoordinatorError::NotAValidator(_) => true,
            CoordinatorError::Store(_) | CoordinatorError::Program(_) => {
                !self.open.lock().contains_key(round)
            }
        }
    }

    // =========================================================================
    // SIGNING
    // =========================================================================

    /// Verify, sign and publish a request, then poll its round once.
    pub async fn sign_request(
        &self,
        request: BridgeRequest,
    ) -> Result<RoundStatus, CoordinatorError> {
        if request.blocked_by_emergency() {
            self.ensure_no_emergency().await?;
        }

        let state = self.deps.settlement.state().await?;
        if !state.is_validator(&self.identity) {
            return Err(CoordinatorError::NotAValidator(self.identity));
        }
        if self.already_finalized(&request, &state).await {
            return Ok(RoundStatus::AlreadyFinalized);
        }

        if let Some(screening) = request.screening() {
            let assessment = self
                .deps
                .security
                .validate_transaction_security(&screening)
                .await;
            if !assessment.valid {
                let vote = Vote::Reject {
                    reason: assessment.findings.join("; "),
                };
                self.publish(&request, vote).await?;
                return Err(CoordinatorError::Rejected {
                    score: assessment.score,
                    findings: assessment.findings,
                });
            }
        }

        let round = self.publish(&request, Vote::Approve).await?;
        {
            let mut open = self.open.lock();
            open.entry(round.clone()).or_insert_with(|| OpenRound {
                request,
                opened_at: self.deps.time.now(),
                verdicts: HashMap::new(),
            });
            ROUNDS_OPEN.set(open.len() as f64);
        }
        info!("[coordinator] Signed round {}", round);

        self.poll_round(&round).await
    }

    /// Propose pausing the bridge at the current nonce and raise the
    /// emergency flag so no validator signs transfers meanwhile.
    pub async fn propose_emergency_pause(
        &self,
        reason: &str,
    ) -> Result<RoundStatus, CoordinatorError> {
        let state = self.deps.settlement.state().await?;
        if state.is_paused {
            return Ok(RoundStatus::AlreadyFinalized);
        }

        if self.deps.store.emergency_mode().await?.is_none() {
            self.deps
                .store
                .set_emergency_mode(&EmergencyFlag {
                    reason: reason.to_string(),
                    raised_by: self.identity,
                    raised_at: self.deps.time.now(),
                })
                .await?;
        }
        warn!("[coordinator] Proposing emergency pause: {}", reason);
        self.sign_request(BridgeRequest::EmergencyPause { nonce: state.nonce })
            .await
    }

    // =========================================================================
    // ROUNDS
    // =========================================================================

    /// Count approvals for one of this validator's rounds and finalize it
    /// once the threshold is reached.
    pub async fn poll_round(&self, round: &str) -> Result<RoundStatus, CoordinatorError> {
        let (request, mut verdicts) = {
            let open = self.open.lock();
            let entry = open
                .get(round)
                .ok_or_else(|| CoordinatorError::UnknownRound(round.to_string()))?;
            (entry.request.clone(), entry.verdicts.clone())
        };

        let state = self.deps.settlement.state().await?;
        if self.already_finalized(&request, &state).await {
            self.close_round(round);
            return Ok(RoundStatus::AlreadyFinalized);
        }

        let messages: Vec<ConsensusMessage> =
            self.deps.store.consensus_messages(round).await?;
        if messages.is_empty() {
            warn!("[coordinator] Round {} expired below threshold", round);
            self.close_round(round);
            return Ok(RoundStatus::Expired);
        }

        let approvals = self
            .collect_approvals(round, &request, &messages, &state, &mut verdicts)
            .await;
        if let Some(entry) = self.open.lock().get_mut(round) {
            entry.verdicts = verdicts;
        }

        if approvals.len() < usize::from(state.threshold) {
            debug!(
                "[coordinator] Round {}: {}/{} approvals",
                round,
                approvals.len(),
                state.threshold
            );
            return Ok(RoundStatus::Pending {
                approvals: approvals.len(),
                threshold: state.threshold,
            });
        }

        if !self.deps.store.claim_round(round, &self.identity).await? {
            debug!("[coordinator] Round {} claimed by a peer", round);
            return Ok(RoundStatus::ClaimedByPeer);
        }

        let count = approvals.len();
        match self.submit(&request, approvals).await {
            Ok(receipt) => {
                self.close_round(round);
                metric_inc!(INSTRUCTIONS_FINALIZED, &[request.kind()]);
                info!(
                    "[coordinator] Finalized {} round {} with {} approvals",
                    request.kind(),
                    round,
                    count
                );
                Ok(RoundStatus::Finalized {
                    receipt,
                    approvals: count,
                    validators: state.validators.len(),
                })
            }
            Err(ProgramError::SourceEventConsumed(_)) | Err(ProgramError::AlreadyPaused) => {
                self.close_round(round);
                Ok(RoundStatus::AlreadyFinalized)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Vote on rounds that peers opened in the store.
    ///
    /// The queue is shared, so most requests reach a validator as a peer's
    /// vote. A round is taken up when any of its votes, approve or reject,
    /// comes from a current validator and verifies; the request then goes
    /// through this validator's own checks as a dequeued one would, so one
    /// peer's refusal is never a veto. Rounds this validator already voted
    /// on are skipped.
    pub async fn join_open_rounds(&self) -> Result<Vec<Processed>, CoordinatorError> {
        let state = self.deps.settlement.state().await?;
        let mut joined = Vec::new();

        for round in self.deps.store.open_rounds().await? {
            if self.open.lock().contains_key(&round) {
                continue;
            }
            let messages: Vec<ConsensusMessage> =
                self.deps.store.consensus_messages(&round).await?;
            if messages.iter().any(|m| m.signer() == self.identity) {
                continue;
            }
            let proposal = messages.iter().find(|m| {
                m.round == round
                    && m.request.round_id() == round
                    && state.is_validator(&m.signer())
                    && verify_signature(
                        &m.signature.validator_public_key,
                        &vote_message(&m.request, &m.vote),
                        &m.signature.signature,
                    )
                    .is_ok()
            });
            let Some(proposal) = proposal else {
                continue;
            };

            let request = proposal.request.clone();
            let result = self.sign_request(request).await;
            match &result {
                Ok(RoundStatus::AlreadyFinalized) => continue,
                Ok(status) => debug!("[coordinator] Joined round {}: {:?}", round, status),
                Err(e) => warn!("[coordinator] Declined round {}: {}", round, e),
            }
            joined.push(Processed { round, result });
        }
        Ok(joined)
    }

    /// Poll every open round. Errors are logged per round.
    pub async fn poll_open_rounds(&self) -> Vec<(String, Result<RoundStatus, CoordinatorError>)> {
        let mut results = Vec::new();
        for round in self.open_rounds() {
            let result = self.poll_round(&round).await;
            if let Err(e) = &result {
                warn!("[coordinator] Poll of round {} failed: {}", round, e);
            }
            results.push((round, result));
        }
        results
    }

    /// Age of an open round in seconds.
    pub fn round_age(&self, round: &str) -> Option<u64> {
        let now = self.deps.time.now();
        self.open
            .lock()
            .get(round)
            .map(|r| now.secs_since(r.opened_at))
    }

    async fn collect_approvals(
        &self,
        round: &str,
        request: &BridgeRequest,
        messages: &[ConsensusMessage],
        state: &BridgeStateView,
        verdicts: &mut Verdicts,
    ) -> Vec<ValidatorSignature> {
        let approve_message = request.message();
        let mut seen = HashSet::new();
        let mut approvals = Vec::new();

        for message in messages {
            let signer = message.signer();
            let source = signer.to_hex();

            if message.round != round || &message.request != request {
                self.deps.counters.record_unauthorized(&source);
                if verdicts.insert(signer, (message.signature.signature, false)).is_none() {
                    self.deps
                        .security
                        .detect_threat(
                            ThreatType::ConsensusAttack,
                            Severity::High,
                            &source,
                            json!({ "round": round, "reason": "conflicting request" }),
                        )
                        .await;
                }
                continue;
            }
            if message.vote != Vote::Approve || !seen.insert(signer) {
                continue;
            }
            self.deps.counters.record_request(&source);

            if !state.is_validator(&signer) {
                self.deps.counters.record_unauthorized(&source);
                debug!("[coordinator] Ignoring non-validator {} in {}", signer, round);
                continue;
            }

            let accepted = match verdicts.get(&signer) {
                Some((signature, verdict)) if *signature == message.signature.signature => *verdict,
                _ => {
                    let assessment = self
                        .deps
                        .security
                        .validate_validator_security(&ValidatorAttestation {
                            validator_id: signer,
                            message: approve_message.clone(),
                            signature: message.signature.signature,
                        })
                        .await;
                    if !assessment.accepted {
                        metric_inc!(SIGNATURE_FAILURES);
                        self.deps.counters.record_failed_auth(&source);
                        warn!(
                            "[coordinator] Approval from {} in {} not counted: {:?}",
                            signer, round, assessment.raised
                        );
                    }
                    verdicts.insert(signer, (message.signature.signature, assessment.accepted));
                    assessment.accepted
                }
            };
            if accepted {
                approvals.push(message.signature);
            }
        }
        approvals
    }

    async fn submit(
        &self,
        request: &BridgeRequest,
        approvals: Vec<ValidatorSignature>,
    ) -> Result<Finalization, ProgramError> {
        let settlement = &self.deps.settlement;
        match request {
            BridgeRequest::Deposit(ix) => settlement
                .deposit_nock(*ix, approvals)
                .await
                .map(Finalization::Deposit),
            BridgeRequest::Withdrawal(ix) => settlement
                .withdraw_nock(*ix, approvals)
                .await
                .map(Finalization::Withdrawal),
            BridgeRequest::EmergencyPause { .. } => settlement
                .emergency_pause(approvals)
                .await
                .map(Finalization::Pause),
        }
    }

    async fn publish(&self, request: &BridgeRequest, vote: Vote) -> Result<String, StoreError> {
        let round = request.round_id();
        let signature = self.keypair.sign(&vote_message(request, &vote));
        let message = ConsensusMessage {
            round: round.clone(),
            request: request.clone(),
            vote,
            signature: ValidatorSignature::new(*self.identity.as_bytes(), *signature.as_bytes()),
            timestamp: self.deps.time.now(),
        };
        self.deps
            .store
            .publish_consensus_message(&round, &self.identity, &message)
            .await?;
        Ok(round)
    }

    async fn already_finalized(&self, request: &BridgeRequest, state: &BridgeStateView) -> bool {
        match request {
            BridgeRequest::EmergencyPause { nonce } => state.is_paused || state.nonce != *nonce,
            _ => match request.replay_key() {
                Some(key) => self.deps.settlement.is_consumed(key).await,
                None => false,
            },
        }
    }

    async fn ensure_no_emergency(&self) -> Result<(), CoordinatorError> {
        if let Some(flag) = self.deps.store.emergency_mode().await? {
            return Err(CoordinatorError::EmergencyActive(flag.reason));
        }
        // Local lockdown refuses signing before the shared flag is raised.
        if let Some(lockdown) = self.deps.security.lockdown().await {
            return Err(CoordinatorError::EmergencyActive(lockdown.reason));
        }
        Ok(())
    }

    fn close_round(&self, round: &str) {
        let mut open = self.open.lock();
        open.remove(round);
        ROUNDS_OPEN.set(open.len() as f64);
    }
}

#[cfg(test)]
mod tests;

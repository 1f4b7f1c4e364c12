//! Round payloads exchanged through the shared store.

use nb_02_security_manager::TransactionRequest;
use nb_03_bridge_protocol::{
    deposit_message, instruction_digest, pause_message, withdraw_message, AdminReceipt,
    DepositInstruction, DepositReceipt, ReplayKey, WithdrawInstruction, WithdrawReceipt,
};
use serde::{Deserialize, Serialize};
use shared_types::{Timestamp, ValidatorId, ValidatorSignature};

/// Domain tag of reject votes. A reject signature never verifies as an approval.
pub const REJECT_DOMAIN: &[u8] = b"NOCKBRIDGE_REJECT_V1";

/// What a signing round authorizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BridgeRequest {
    /// Credit wrapped tokens for a source-chain lock.
    Deposit(DepositInstruction),
    /// Burn wrapped tokens and release NOCK.
    Withdrawal(WithdrawInstruction),
    /// Pause the bridge at the given program nonce.
    EmergencyPause {
        /// Program nonce the pause message binds.
        nonce: u64,
    },
}

impl BridgeRequest {
    /// Round id: hex of the source event id, of the withdrawal request id,
    /// or `pause-<nonce>`.
    pub fn round_id(&self) -> String {
        match self {
            BridgeRequest::Deposit(ix) => {
                let event = &ix.proof.event;
                format!(
                    "{}{}",
                    hex::encode(event.tx_hash),
                    hex::encode(event.log_index.to_be_bytes())
                )
            }
            BridgeRequest::Withdrawal(ix) => hex::encode(ix.request_id),
            BridgeRequest::EmergencyPause { nonce } => format!("pause-{nonce}"),
        }
    }

    /// Canonical bytes validators sign to approve.
    pub fn message(&self) -> Vec<u8> {
        match self {
            BridgeRequest::Deposit(ix) => deposit_message(ix),
            BridgeRequest::Withdrawal(ix) => withdraw_message(ix),
            BridgeRequest::EmergencyPause { nonce } => pause_message(*nonce),
        }
    }

    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeRequest::Deposit(_) => "deposit",
            BridgeRequest::Withdrawal(_) => "withdrawal",
            BridgeRequest::EmergencyPause { .. } => "pause",
        }
    }

    /// Replay key of transfers. Pauses are guarded by the nonce instead.
    pub fn replay_key(&self) -> Option<ReplayKey> {
        match self {
            BridgeRequest::Deposit(ix) => Some(ix.replay_key()),
            BridgeRequest::Withdrawal(ix) => Some(ix.replay_key()),
            BridgeRequest::EmergencyPause { .. } => None,
        }
    }

    /// Whether this request is refused while the emergency flag is set.
    pub fn blocked_by_emergency(&self) -> bool {
        !matches!(self, BridgeRequest::EmergencyPause { .. })
    }

    /// Input of the transaction security check. Pauses are not screened.
    pub fn screening(&self) -> Option<TransactionRequest> {
        let (account, amount) = match self {
            BridgeRequest::Deposit(ix) => (ix.recipient, ix.amount),
            BridgeRequest::Withdrawal(ix) => (ix.owner, ix.amount),
            BridgeRequest::EmergencyPause { .. } => return None,
        };
        Some(TransactionRequest {
            source: format!("account:{}", hex::encode(account)),
            amount,
            payload: self.message(),
        })
    }
}

/// A validator's vote on a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "vote", rename_all = "snake_case")]
pub enum Vote {
    /// Signature over the request's canonical message.
    Approve,
    /// Signature over the reject message; never counted.
    Reject {
        /// Why the validator refused.
        reason: String,
    },
}

/// Bytes signed for `vote` on `request`.
pub fn vote_message(request: &BridgeRequest, vote: &Vote) -> Vec<u8> {
    let message = request.message();
    match vote {
        Vote::Approve => message,
        Vote::Reject { .. } => {
            let mut reject = REJECT_DOMAIN.to_vec();
            reject.extend_from_slice(&instruction_digest(&message));
            reject
        }
    }
}

/// One validator's message for a round, published under
/// `consensus:<round>:<validator>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusMessage {
    /// Round id.
    pub round: String,
    /// The request voted on.
    pub request: BridgeRequest,
    /// The vote.
    pub vote: Vote,
    /// Signer and signature over `vote_message(request, vote)`.
    pub signature: ValidatorSignature,
    /// Publication time.
    pub timestamp: Timestamp,
}

impl ConsensusMessage {
    /// The signing validator.
    pub fn signer(&self) -> ValidatorId {
        self.signature.signer()
    }
}

/// Program receipt of a finalized round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finalization {
    /// Deposit credited.
    Deposit(DepositReceipt),
    /// Withdrawal burned.
    Withdrawal(WithdrawReceipt),
    /// Bridge paused.
    Pause(AdminReceipt),
}

/// Where a round stands after a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundStatus {
    /// Below threshold; stays open.
    Pending {
        /// Approvals counted so far.
        approvals: usize,
        /// Approvals needed.
        threshold: u8,
    },
    /// This validator submitted the finalize instruction.
    Finalized {
        /// Program receipt.
        receipt: Finalization,
        /// Approvals submitted.
        approvals: usize,
        /// Size of the validator set.
        validators: usize,
    },
    /// Another validator finalized it first.
    AlreadyFinalized,
    /// Threshold reached; another validator holds the submission claim.
    ClaimedByPeer,
    /// Every message of the round expired before threshold.
    Expired,
}

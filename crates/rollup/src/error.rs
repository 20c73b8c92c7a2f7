use alloy_primitives::{Address, U256};
use glide_commitment::CommitmentError;
use glide_ledger::LedgerError;
use glide_primitives::{BatchId, BatchStatus, ChallengeId, Role, Timestamp, TransactionError};
use thiserror::Error;

/// Every way a rollup operation can be refused. No variant implies a partial
/// state change: the transition either happened in full or not at all.
#[derive(Debug, Error)]
pub enum RollupError {
    #[error("No queued transactions to cut into a batch")]
    EmptyBatch,
    #[error("Malformed transaction: {0}")]
    MalformedTransaction(#[from] TransactionError),
    #[error("Malformed fraud claim: {0}")]
    MalformedClaim(String),
    #[error("Batch {0} not found")]
    BatchNotFound(BatchId),
    #[error("Challenge {0} not found")]
    ChallengeNotFound(ChallengeId),
    #[error("Batch {0} is already verified")]
    AlreadyVerified(BatchId),
    #[error("Batch {id} is {status}, it must be committed first")]
    NotCommitted { id: BatchId, status: BatchStatus },
    #[error("Batch {id} is {status}, it must be verified first")]
    NotVerified { id: BatchId, status: BatchStatus },
    #[error("Batch {0} is already finalized")]
    AlreadyFinalized(BatchId),
    #[error("Challenge period of batch {id} ends at {deadline}, now is {now}")]
    ChallengePeriodActive {
        id: BatchId,
        deadline: Timestamp,
        now: Timestamp,
    },
    #[error("Batch {id} has pending challenge {challenge}")]
    ChallengePending { id: BatchId, challenge: ChallengeId },
    #[error("Batch {id} is {status} and can no longer change")]
    ImmutableState { id: BatchId, status: BatchStatus },
    #[error("Batch {id} is not open to challenges ({status})")]
    BatchNotChallengeable { id: BatchId, status: BatchStatus },
    #[error("Batch {id} already has challenge {challenge} in flight")]
    ChallengeInFlight { id: BatchId, challenge: ChallengeId },
    #[error("Challenge {0} is already resolved")]
    AlreadyResolved(ChallengeId),
    #[error("{address} does not hold the {role} role")]
    Unauthorized { address: Address, role: Role },
    #[error("{address} cannot cover a penalty of {required}: balance is {balance}")]
    InsufficientPenaltyFunds {
        address: Address,
        balance: U256,
        required: U256,
    },
    #[error("Stored batch {id} is corrupt: {reason}")]
    CorruptBatch { id: BatchId, reason: String },
    #[error("Stored rollup state is inconsistent: {0}")]
    CorruptState(String),
    #[error(transparent)]
    Commitment(#[from] CommitmentError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Collaborator failed: {0:#}")]
    Collaborator(#[source] anyhow::Error),
    #[error("Storage failed: {0:#}")]
    Storage(#[source] anyhow::Error),
}

use alloy_primitives::{Address, U256};
use borsh::{BorshDeserialize, BorshSerialize};
use glide_primitives::{
    Batch, BatchId, BatchStatus, Challenge, ChallengeId, ChallengeStatus, FraudClaim, Hash256,
    SettlementDomain, Timestamp, Transaction,
};

/// An address as stored in the database
pub type DbAddress = [u8; 20];
/// A big-endian 256-bit amount as stored in the database
pub type DbAmount = [u8; 32];

pub(crate) fn address_to_db(address: &Address) -> DbAddress {
    address.0 .0
}

pub(crate) fn amount_to_db(amount: &U256) -> DbAmount {
    amount.to_be_bytes::<32>()
}

pub(crate) fn amount_from_db(bytes: DbAmount) -> U256 {
    U256::from_be_bytes(bytes)
}

/// The on-disk format of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct StoredTransaction {
    pub sender: DbAddress,
    pub recipient: DbAddress,
    pub amount: DbAmount,
}

impl From<&Transaction> for StoredTransaction {
    fn from(tx: &Transaction) -> Self {
        Self {
            sender: address_to_db(&tx.sender),
            recipient: address_to_db(&tx.recipient),
            amount: amount_to_db(&tx.amount),
        }
    }
}

impl From<StoredTransaction> for Transaction {
    fn from(tx: StoredTransaction) -> Self {
        Transaction::new(
            Address::from(tx.sender),
            Address::from(tx.recipient),
            amount_from_db(tx.amount),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
#[borsh(use_discriminant = true)]
pub enum StoredBatchStatus {
    Pending = 0,
    Committed = 1,
    Verified = 2,
    Finalized = 3,
    Rejected = 4,
}

impl From<BatchStatus> for StoredBatchStatus {
    fn from(status: BatchStatus) -> Self {
        match status {
            BatchStatus::Pending => StoredBatchStatus::Pending,
            BatchStatus::Committed => StoredBatchStatus::Committed,
            BatchStatus::Verified => StoredBatchStatus::Verified,
            BatchStatus::Finalized => StoredBatchStatus::Finalized,
            BatchStatus::Rejected => StoredBatchStatus::Rejected,
        }
    }
}

impl From<StoredBatchStatus> for BatchStatus {
    fn from(status: StoredBatchStatus) -> Self {
        match status {
            StoredBatchStatus::Pending => BatchStatus::Pending,
            StoredBatchStatus::Committed => BatchStatus::Committed,
            StoredBatchStatus::Verified => BatchStatus::Verified,
            StoredBatchStatus::Finalized => BatchStatus::Finalized,
            StoredBatchStatus::Rejected => BatchStatus::Rejected,
        }
    }
}

/// The on-disk format of a batch. Leaves and root are kept in the same record
/// so they can be checked against each other on load.
#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct StoredBatch {
    pub id: u64,
    pub submitter: DbAddress,
    pub domain: DbAddress,
    pub leaves: Vec<StoredTransaction>,
    pub root: Hash256,
    pub status: StoredBatchStatus,
    pub created_at: u64,
    pub verified_at: Option<u64>,
    pub challenge_deadline: Option<u64>,
    pub finalized_at: Option<u64>,
    pub rejection_reason: Option<String>,
    pub opening_balances: Vec<(DbAddress, DbAmount)>,
}

impl From<&Batch> for StoredBatch {
    fn from(batch: &Batch) -> Self {
        Self {
            id: batch.id.0,
            submitter: address_to_db(&batch.submitter),
            domain: address_to_db(&batch.domain.contract()),
            leaves: batch.leaves.iter().map(StoredTransaction::from).collect(),
            root: batch.root,
            status: batch.status.into(),
            created_at: batch.created_at.0,
            verified_at: batch.verified_at.map(|ts| ts.0),
            challenge_deadline: batch.challenge_deadline.map(|ts| ts.0),
            finalized_at: batch.finalized_at.map(|ts| ts.0),
            rejection_reason: batch.rejection_reason.clone(),
            opening_balances: batch
                .opening_balances
                .iter()
                .map(|(address, balance)| (address_to_db(address), amount_to_db(balance)))
                .collect(),
        }
    }
}

impl From<StoredBatch> for Batch {
    fn from(stored: StoredBatch) -> Self {
        Batch {
            id: BatchId(stored.id),
            submitter: Address::from(stored.submitter),
            domain: SettlementDomain::new(Address::from(stored.domain)),
            leaves: stored.leaves.into_iter().map(Transaction::from).collect(),
            root: stored.root,
            status: stored.status.into(),
            created_at: Timestamp(stored.created_at),
            verified_at: stored.verified_at.map(Timestamp),
            challenge_deadline: stored.challenge_deadline.map(Timestamp),
            finalized_at: stored.finalized_at.map(Timestamp),
            rejection_reason: stored.rejection_reason,
            opening_balances: stored
                .opening_balances
                .into_iter()
                .map(|(address, balance)| (Address::from(address), amount_from_db(balance)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
#[borsh(use_discriminant = true)]
pub enum StoredChallengeStatus {
    Pending = 0,
    Accepted = 1,
    Rejected = 2,
}

impl From<ChallengeStatus> for StoredChallengeStatus {
    fn from(status: ChallengeStatus) -> Self {
        match status {
            ChallengeStatus::Pending => StoredChallengeStatus::Pending,
            ChallengeStatus::Accepted => StoredChallengeStatus::Accepted,
            ChallengeStatus::Rejected => StoredChallengeStatus::Rejected,
        }
    }
}

impl From<StoredChallengeStatus> for ChallengeStatus {
    fn from(status: StoredChallengeStatus) -> Self {
        match status {
            StoredChallengeStatus::Pending => ChallengeStatus::Pending,
            StoredChallengeStatus::Accepted => ChallengeStatus::Accepted,
            StoredChallengeStatus::Rejected => ChallengeStatus::Rejected,
        }
    }
}

/// The on-disk format of a challenge and the claim it carries.
#[derive(Debug, Clone, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct StoredChallenge {
    pub id: u64,
    pub batch_id: u64,
    pub challenger: DbAddress,
    pub asserted_transaction: StoredTransaction,
    pub merkle_proof: Vec<Hash256>,
    pub reason: Option<String>,
    pub status: StoredChallengeStatus,
    pub submitted_at: u64,
    pub resolved_by: Option<DbAddress>,
    pub resolved_at: Option<u64>,
}

impl From<&Challenge> for StoredChallenge {
    fn from(challenge: &Challenge) -> Self {
        Self {
            id: challenge.id.0,
            batch_id: challenge.batch_id.0,
            challenger: address_to_db(&challenge.challenger),
            asserted_transaction: StoredTransaction::from(&challenge.claim.asserted_transaction),
            merkle_proof: challenge.claim.merkle_proof.clone(),
            reason: challenge.claim.reason.clone(),
            status: challenge.status.into(),
            submitted_at: challenge.submitted_at.0,
            resolved_by: challenge.resolved_by.as_ref().map(address_to_db),
            resolved_at: challenge.resolved_at.map(|ts| ts.0),
        }
    }
}

impl From<StoredChallenge> for Challenge {
    fn from(stored: StoredChallenge) -> Self {
        Challenge {
            id: ChallengeId(stored.id),
            batch_id: BatchId(stored.batch_id),
            challenger: Address::from(stored.challenger),
            claim: FraudClaim {
                asserted_transaction: stored.asserted_transaction.into(),
                merkle_proof: stored.merkle_proof,
                reason: stored.reason,
            },
            status: stored.status.into(),
            submitted_at: Timestamp(stored.submitted_at),
            resolved_by: stored.resolved_by.map(Address::from),
            resolved_at: stored.resolved_at.map(Timestamp),
        }
    }
}

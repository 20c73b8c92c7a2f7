use core::fmt;
use std::collections::BTreeSet;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;
use crate::types::{BatchId, Hash256, SettlementDomain, Timestamp};

/// Status of a batch. The lifecycle only moves forward:
///
/// ```text
/// Pending -> Committed -> Verified -> Finalized
///                             \
///                              -> Rejected
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Committed,
    Verified,
    Finalized,
    Rejected,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Finalized | BatchStatus::Rejected)
    }

    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        matches!(
            (self, next),
            (BatchStatus::Pending, BatchStatus::Committed)
                | (BatchStatus::Committed, BatchStatus::Verified)
                | (BatchStatus::Verified, BatchStatus::Finalized)
                | (BatchStatus::Verified, BatchStatus::Rejected)
        )
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Committed => "committed",
            BatchStatus::Verified => "verified",
            BatchStatus::Finalized => "finalized",
            BatchStatus::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Returned by [`Batch::advance`] when the requested edge is not in the DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: BatchStatus,
    pub to: BatchStatus,
}

/// An ordered set of transfers committed under one merkle root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    /// Operator that cut the batch. Pays the penalty if the batch is proven fraudulent.
    pub submitter: Address,
    pub domain: SettlementDomain,
    pub leaves: Vec<Transaction>,
    #[serde(with = "hex::serde")]
    pub root: Hash256,
    pub status: BatchStatus,
    pub created_at: Timestamp,
    pub verified_at: Option<Timestamp>,
    pub challenge_deadline: Option<Timestamp>,
    pub finalized_at: Option<Timestamp>,
    pub rejection_reason: Option<String>,
    /// Balance of every account the batch touches, taken just before it was
    /// verified. Fraud claims are replayed from here.
    #[serde(default)]
    pub opening_balances: Vec<(Address, U256)>,
}

impl Batch {
    /// Creates a batch in the `Pending` state. `root` must be the commitment of `leaves`.
    pub fn new(
        id: BatchId,
        submitter: Address,
        domain: SettlementDomain,
        leaves: Vec<Transaction>,
        root: Hash256,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            submitter,
            domain,
            leaves,
            root,
            status: BatchStatus::Pending,
            created_at,
            verified_at: None,
            challenge_deadline: None,
            finalized_at: None,
            rejection_reason: None,
            opening_balances: Vec::new(),
        }
    }

    /// Every sender and recipient in the batch.
    pub fn accounts(&self) -> BTreeSet<Address> {
        self.leaves
            .iter()
            .flat_map(|tx| [tx.sender, tx.recipient])
            .collect()
    }

    pub fn involves(&self, address: &Address) -> bool {
        self.leaves.iter().any(|tx| tx.involves(address))
    }

    /// Sum of all transfer amounts, `None` on overflow.
    pub fn total_amount(&self) -> Option<U256> {
        self.leaves
            .iter()
            .try_fold(U256::ZERO, |acc, tx| acc.checked_add(tx.amount))
    }

    pub fn advance(&mut self, next: BatchStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn is_challengeable_at(&self, now: Timestamp) -> bool {
        self.status == BatchStatus::Verified
            && self.challenge_deadline.is_some_and(|deadline| now < deadline)
    }
}

use core::fmt;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;
use crate::types::{hex_hashes, BatchId, ChallengeId, Hash256, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    Pending,
    /// The claim held: the batch was rejected and its submitter penalized.
    Accepted,
    /// The claim was baseless: the challenger was penalized.
    Rejected,
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChallengeStatus::Pending => "pending",
            ChallengeStatus::Accepted => "accepted",
            ChallengeStatus::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Evidence submitted against a verified batch.
///
/// The challenger asserts that `asserted_transaction` is part of the batch and
/// supplies the sibling path that should connect its digest to the batch root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudClaim {
    pub asserted_transaction: Transaction,
    #[serde(with = "hex_hashes")]
    pub merkle_proof: Vec<Hash256>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub batch_id: BatchId,
    pub challenger: Address,
    pub claim: FraudClaim,
    pub status: ChallengeStatus,
    pub submitted_at: Timestamp,
    pub resolved_by: Option<Address>,
    pub resolved_at: Option<Timestamp>,
}

impl Challenge {
    pub fn new(
        id: ChallengeId,
        batch_id: BatchId,
        challenger: Address,
        claim: FraudClaim,
        submitted_at: Timestamp,
    ) -> Self {
        Self {
            id,
            batch_id,
            challenger,
            claim,
            status: ChallengeStatus::Pending,
            submitted_at,
            resolved_by: None,
            resolved_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ChallengeStatus::Pending
    }
}

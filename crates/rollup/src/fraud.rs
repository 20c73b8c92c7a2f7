use alloy_primitives::{Address, U256};
use glide_commitment::MerkleTree;
use glide_ledger::{Ledger, LedgerError};
use glide_primitives::{Batch, BatchStatus, FraudClaim};
use serde::{Deserialize, Serialize};

use crate::error::RollupError;

/// Why an included transaction is invalid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SemanticViolation {
    /// The transaction itself is structurally invalid.
    Malformed { reason: String },
    /// Replaying the batch up to the asserted transaction overdraws a balance.
    Overdraft {
        index: usize,
        address: Address,
        balance: U256,
        required: U256,
    },
}

/// Outcome of checking a fraud claim against a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimAssessment {
    /// Whether the proof connects the asserted transaction to the batch root.
    pub inclusion_proven: bool,
    pub semantic_violation: Option<SemanticViolation>,
}

impl ClaimAssessment {
    /// A claim is fraud evidence when the asserted transaction is not provably
    /// included, or when it is included but invalid.
    pub fn is_fraud(&self) -> bool {
        !self.inclusion_proven || self.semantic_violation.is_some()
    }
}

/// Evaluates `claim` against `batch`.
///
/// A batch that went through verification is replayed from the balances
/// recorded just before it was applied. A committed batch is replayed on
/// `ledger`.
pub(crate) fn assess(
    batch: &Batch,
    claim: &FraudClaim,
    ledger: &Ledger,
) -> Result<ClaimAssessment, RollupError> {
    let digest = claim.asserted_transaction.digest();
    let inclusion_proven = MerkleTree::verify(&digest, &claim.merkle_proof, &batch.root);

    let semantic_violation = if inclusion_proven {
        match asserted_position(batch, claim)? {
            Some(position) => replay_until(batch, position, ledger)?,
            None => None,
        }
    } else {
        None
    };

    Ok(ClaimAssessment {
        inclusion_proven,
        semantic_violation,
    })
}

/// Leaf index the claim refers to.
///
/// Identical transfers share a digest, so the proof decides between copies.
/// Copies the proof cannot tell apart resolve to the last one, whose replay
/// covers the earlier ones.
fn asserted_position(batch: &Batch, claim: &FraudClaim) -> Result<Option<usize>, RollupError> {
    let tree = MerkleTree::from_transactions(&batch.leaves)?;
    let mut last_copy = None;
    for (index, tx) in batch.leaves.iter().enumerate().rev() {
        if *tx != claim.asserted_transaction {
            continue;
        }
        if tree.proof(index)? == claim.merkle_proof {
            return Ok(Some(index));
        }
        last_copy.get_or_insert(index);
    }
    Ok(last_copy)
}

fn opening_ledger(batch: &Batch) -> Result<Ledger, RollupError> {
    if batch.opening_balances.is_empty() {
        return Err(RollupError::CorruptState(format!(
            "batch {} is {} but has no opening balances",
            batch.id, batch.status
        )));
    }
    Ok(Ledger::from_balances(
        batch
            .opening_balances
            .iter()
            .map(|(address, balance)| (*address, batch.domain, *balance)),
    ))
}

fn replay_until(
    batch: &Batch,
    position: usize,
    ledger: &Ledger,
) -> Result<Option<SemanticViolation>, RollupError> {
    if let Err(e) = batch.leaves[position].validate() {
        return Ok(Some(SemanticViolation::Malformed {
            reason: e.to_string(),
        }));
    }

    let opening;
    let base = match batch.status {
        BatchStatus::Pending | BatchStatus::Committed => ledger,
        BatchStatus::Verified | BatchStatus::Finalized | BatchStatus::Rejected => {
            opening = opening_ledger(batch)?;
            &opening
        }
    };

    let mut staged = base.stage();
    for (index, tx) in batch.leaves[..=position].iter().enumerate() {
        if let Err(LedgerError::InsufficientBalance {
            address,
            balance,
            required,
            ..
        }) = staged.apply_transaction(tx, batch.domain)
        {
            return Ok(Some(SemanticViolation::Overdraft {
                index,
                address,
                balance,
                required,
            }));
        }
    }
    Ok(None)
}

use std::sync::Arc;

use alloy_primitives::{Address, B256};
use glide_commitment::MerkleTree;
use glide_db::{ChangeSet, QueuedTransaction, RollupStore};
use glide_primitives::{Batch, BatchId, BatchStatus, Hash256, Role, Transaction};
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use crate::error::RollupError;
use crate::rollup::Rollup;

impl<Db: RollupStore> Rollup<Db> {
    /// Cuts a batch as the configured operator.
    pub fn cut_batch(&self) -> Result<Batch, RollupError> {
        self.cut_batch_as(self.config.operator)
    }

    /// Takes up to `max_batch_size` queued transfers, commits to them and
    /// hands the batch to the settlement layer.
    ///
    /// The transfers stay queued until the batch record is committed, and
    /// leave the queue in that same commit. A failed cut therefore leaves the
    /// queue as it was, except that malformed entries are dropped.
    #[instrument(level = "debug", skip(self), err)]
    pub fn cut_batch_as(&self, submitter: Address) -> Result<Batch, RollupError> {
        self.authorize(&submitter, Role::Operator)?;
        let _cut = self.cut_lock.lock();

        let queued = self
            .store
            .peek_pending_transactions(self.config.max_batch_size)
            .map_err(RollupError::Storage)?;
        if queued.is_empty() {
            return Err(RollupError::EmptyBatch);
        }

        let mut malformed = Vec::new();
        let mut first_error = None;
        for (index, entry) in queued.iter().enumerate() {
            if let Err(e) = entry.tx.validate() {
                warn!(
                    index,
                    seq = entry.seq,
                    tx = ?entry.tx,
                    "Dropping malformed queued transaction: {}",
                    e
                );
                malformed.push(entry.seq);
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            self.store
                .commit(&ChangeSet::new().with_consumed(malformed))
                .map_err(RollupError::Storage)?;
            return Err(RollupError::MalformedTransaction(e));
        }

        self.commit_cut(submitter, &queued)
    }

    fn commit_cut(
        &self,
        submitter: Address,
        queued: &[QueuedTransaction],
    ) -> Result<Batch, RollupError> {
        let txs: Vec<Transaction> = queued.iter().map(|entry| entry.tx).collect();
        let tree = MerkleTree::from_transactions(&txs)?;
        let id = self
            .batches
            .read()
            .keys()
            .next_back()
            .map_or(BatchId(1), |last| last.next());

        let mut batch = Batch::new(
            id,
            submitter,
            self.domain(),
            txs,
            tree.root(),
            self.clock.now(),
        );
        advance(&mut batch, BatchStatus::Committed)?;

        self.settlement
            .submit_batch(&batch)
            .map_err(RollupError::Collaborator)?;
        self.store
            .commit(
                &ChangeSet::new()
                    .with_batch(batch.clone())
                    .with_consumed(queued.iter().map(|entry| entry.seq)),
            )
            .map_err(RollupError::Storage)?;

        self.batches
            .write()
            .insert(id, Arc::new(Mutex::new(batch.clone())));
        info!(
            %id,
            %submitter,
            transactions = batch.leaves.len(),
            root = %B256::from(batch.root),
            "Committed batch"
        );
        Ok(batch)
    }

    /// Marks a committed batch as verified, opens its challenge window and
    /// applies its transfers to the ledger.
    ///
    /// Transfers are applied in leaf order. If any of them would overdraw a
    /// balance the whole batch is refused and stays committed. The balances
    /// the touched accounts held beforehand are kept on the batch for fraud
    /// replay.
    #[instrument(level = "debug", skip(self), err)]
    pub fn verify_batch(&self, id: BatchId, caller: Address) -> Result<Batch, RollupError> {
        self.authorize(&caller, Role::Verifier)?;
        let handle = self.batch_handle(id)?;
        let mut batch = handle.lock();

        match batch.status {
            BatchStatus::Committed => {}
            BatchStatus::Verified | BatchStatus::Finalized | BatchStatus::Rejected => {
                return Err(RollupError::AlreadyVerified(id))
            }
            BatchStatus::Pending => {
                return Err(RollupError::NotCommitted {
                    id,
                    status: batch.status,
                })
            }
        }

        let now = self.clock.now();
        let mut ledger = self.ledger.lock();
        let opening_balances: Vec<_> = batch
            .accounts()
            .into_iter()
            .map(|address| (address, ledger.balance_of(&address, &batch.domain)))
            .collect();

        let mut staged = ledger.stage();
        for (index, tx) in batch.leaves.iter().enumerate() {
            staged.apply_transaction(tx, batch.domain).map_err(|e| {
                warn!(%id, index, "Batch transfer cannot be applied: {}", e);
                e
            })?;
        }
        let change = staged.into_change();

        let total = batch.total_amount();
        if change.debited_total() != total {
            return Err(RollupError::CorruptState(format!(
                "batch {id} moves {total:?} but its transfers debit {:?}",
                change.debited_total()
            )));
        }

        let mut updated = batch.clone();
        advance(&mut updated, BatchStatus::Verified)?;
        let deadline = now.saturating_add_millis(self.config.challenge_period_ms);
        updated.verified_at = Some(now);
        updated.challenge_deadline = Some(deadline);
        updated.opening_balances = opening_balances;

        self.store
            .commit(
                &ChangeSet::new()
                    .with_batch(updated.clone())
                    .with_ledger(change.clone()),
            )
            .map_err(RollupError::Storage)?;
        ledger.commit(&change);
        *batch = updated;

        info!(%id, %caller, %deadline, "Verified batch");
        Ok(batch.clone())
    }

    /// Finalizes a verified batch once its challenge window has closed and no
    /// challenge is pending. Balances were already applied at verification.
    #[instrument(level = "debug", skip(self), err)]
    pub fn finalize_batch(&self, id: BatchId) -> Result<Batch, RollupError> {
        let handle = self.batch_handle(id)?;
        let mut batch = handle.lock();

        match batch.status {
            BatchStatus::Verified => {}
            BatchStatus::Finalized => return Err(RollupError::AlreadyFinalized(id)),
            BatchStatus::Pending | BatchStatus::Committed | BatchStatus::Rejected => {
                return Err(RollupError::NotVerified {
                    id,
                    status: batch.status,
                })
            }
        }

        let now = self.clock.now();
        let deadline = batch.challenge_deadline.ok_or_else(|| {
            RollupError::CorruptState(format!("verified batch {id} has no challenge deadline"))
        })?;
        if now < deadline {
            return Err(RollupError::ChallengePeriodActive { id, deadline, now });
        }

        if let Some(challenge) = self
            .challenges
            .read()
            .values()
            .find(|challenge| challenge.batch_id == id && challenge.is_pending())
        {
            return Err(RollupError::ChallengePending {
                id,
                challenge: challenge.id,
            });
        }

        let mut updated = batch.clone();
        advance(&mut updated, BatchStatus::Finalized)?;
        updated.finalized_at = Some(now);

        self.store
            .persist_batch(&updated)
            .map_err(RollupError::Storage)?;
        *batch = updated;

        info!(%id, "Finalized batch");
        Ok(batch.clone())
    }

    /// Inclusion proof for the transaction at `index` in batch `id`.
    pub fn get_proof(&self, id: BatchId, index: usize) -> Result<Vec<Hash256>, RollupError> {
        let handle = self.batch_handle(id)?;
        let batch = handle.lock();
        let tree = MerkleTree::from_transactions(&batch.leaves)?;
        Ok(tree.proof(index)?)
    }
}

/// Moves `batch` along an edge the caller has already checked is legal.
pub(crate) fn advance(batch: &mut Batch, next: BatchStatus) -> Result<(), RollupError> {
    batch.advance(next).map_err(|invalid| {
        RollupError::CorruptState(format!(
            "batch {} cannot move from {} to {}",
            batch.id, invalid.from, invalid.to
        ))
    })
}

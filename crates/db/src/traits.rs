use alloy_primitives::{Address, U256};
use anyhow::{anyhow, Result};
use glide_ledger::{BalanceDelta, Delta, LedgerChange};
use glide_primitives::{Batch, Challenge, SettlementDomain, Transaction};

use crate::change_set::ChangeSet;

/// Durable storage of batches, challenges and balances, together with the
/// queue of transfers waiting to be cut.
pub trait RollupStore: TransactionQueue {
    /// Writes every record in `changes` and removes the queue entries it
    /// consumes, in one atomic step. Fails without writing anything if one of
    /// those entries is no longer queued.
    fn commit(&self, changes: &ChangeSet) -> Result<()>;

    /// All batches ordered by id.
    fn load_batches(&self) -> Result<Vec<Batch>>;

    /// All challenges ordered by id.
    fn load_challenges(&self) -> Result<Vec<Challenge>>;

    /// Every nonzero balance.
    fn load_balances(&self) -> Result<Vec<(Address, SettlementDomain, U256)>>;

    fn load_balance(&self, address: &Address, domain: &SettlementDomain) -> Result<U256>;

    /// Stores a single batch record.
    fn persist_batch(&self, batch: &Batch) -> Result<()> {
        self.commit(&ChangeSet::new().with_batch(batch.clone()))
    }

    /// Applies a single delta to the stored balance.
    fn persist_ledger_delta(
        &self,
        address: Address,
        delta: Delta,
        domain: SettlementDomain,
    ) -> Result<()> {
        let current = self.load_balance(&address, &domain)?;
        let updated = match delta {
            Delta::Credit(amount) => current
                .checked_add(amount)
                .ok_or_else(|| anyhow!("Stored balance of {address} in {domain} overflows"))?,
            Delta::Debit(amount) => current.checked_sub(amount).ok_or_else(|| {
                anyhow!("Stored balance of {address} in {domain} is {current}, cannot debit {amount}")
            })?,
        };
        let change = LedgerChange {
            deltas: vec![BalanceDelta {
                address,
                domain,
                delta,
            }],
            balances: vec![(address, domain, updated)],
        };
        self.commit(&ChangeSet::new().with_ledger(change))
    }
}

/// A queued transfer and its position in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedTransaction {
    /// Increases with every enqueue and is never reused.
    pub seq: u64,
    pub tx: Transaction,
}

/// FIFO of transfers waiting to be cut into a batch.
///
/// Reading never removes entries. They leave the queue through
/// [`ChangeSet::consumed`] in the same commit that records what became of them.
pub trait TransactionQueue: Send + Sync {
    fn enqueue_transaction(&self, tx: Transaction) -> Result<()>;

    /// Up to `limit` of the oldest queued transfers, oldest first.
    fn peek_pending_transactions(&self, limit: usize) -> Result<Vec<QueuedTransaction>>;

    fn pending_count(&self) -> Result<usize>;
}

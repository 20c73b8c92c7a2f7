use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use anyhow::{bail, Result};
use glide_primitives::{Batch, BatchId, Challenge, ChallengeId, SettlementDomain, Transaction};
use parking_lot::RwLock;

use crate::change_set::ChangeSet;
use crate::traits::{QueuedTransaction, RollupStore, TransactionQueue};

#[derive(Debug, Default)]
struct InMemoryState {
    batches: BTreeMap<BatchId, Batch>,
    challenges: BTreeMap<ChallengeId, Challenge>,
    balances: BTreeMap<(Address, SettlementDomain), U256>,
    pending: BTreeMap<u64, Transaction>,
    next_seq: u64,
}

/// Process-local [`RollupStore`], used by tests and ephemeral nodes.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<InMemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RollupStore for InMemoryStore {
    fn commit(&self, changes: &ChangeSet) -> Result<()> {
        let mut state = self.state.write();
        if let Some(seq) = changes
            .consumed
            .iter()
            .find(|seq| !state.pending.contains_key(*seq))
        {
            bail!("Queue entry {seq} is no longer pending");
        }

        for seq in &changes.consumed {
            state.pending.remove(seq);
        }
        for batch in &changes.batches {
            state.batches.insert(batch.id, batch.clone());
        }
        for challenge in &changes.challenges {
            state.challenges.insert(challenge.id, challenge.clone());
        }
        for (address, domain, amount) in &changes.ledger.balances {
            if amount.is_zero() {
                state.balances.remove(&(*address, *domain));
            } else {
                state.balances.insert((*address, *domain), *amount);
            }
        }
        Ok(())
    }

    fn load_batches(&self) -> Result<Vec<Batch>> {
        Ok(self.state.read().batches.values().cloned().collect())
    }

    fn load_challenges(&self) -> Result<Vec<Challenge>> {
        Ok(self.state.read().challenges.values().cloned().collect())
    }

    fn load_balances(&self) -> Result<Vec<(Address, SettlementDomain, U256)>> {
        Ok(self
            .state
            .read()
            .balances
            .iter()
            .map(|((address, domain), amount)| (*address, *domain, *amount))
            .collect())
    }

    fn load_balance(&self, address: &Address, domain: &SettlementDomain) -> Result<U256> {
        Ok(self
            .state
            .read()
            .balances
            .get(&(*address, *domain))
            .copied()
            .unwrap_or(U256::ZERO))
    }
}

impl TransactionQueue for InMemoryStore {
    fn enqueue_transaction(&self, tx: Transaction) -> Result<()> {
        let mut state = self.state.write();
        state.next_seq += 1;
        let seq = state.next_seq;
        state.pending.insert(seq, tx);
        Ok(())
    }

    fn peek_pending_transactions(&self, limit: usize) -> Result<Vec<QueuedTransaction>> {
        Ok(self
            .state
            .read()
            .pending
            .iter()
            .take(limit)
            .map(|(seq, tx)| QueuedTransaction { seq: *seq, tx: *tx })
            .collect())
    }

    fn pending_count(&self) -> Result<usize> {
        Ok(self.state.read().pending.len())
    }
}

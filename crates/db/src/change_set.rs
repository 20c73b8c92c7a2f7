use glide_ledger::LedgerChange;
use glide_primitives::{Batch, Challenge};

/// Every write produced by a single state transition.
///
/// A store must apply a change set entirely or not at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub batches: Vec<Batch>,
    pub challenges: Vec<Challenge>,
    pub ledger: LedgerChange,
    /// Sequence numbers of the queue entries this transition takes out of the queue.
    pub consumed: Vec<u64>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch(mut self, batch: Batch) -> Self {
        self.batches.push(batch);
        self
    }

    pub fn with_challenge(mut self, challenge: Challenge) -> Self {
        self.challenges.push(challenge);
        self
    }

    pub fn with_ledger(mut self, change: LedgerChange) -> Self {
        self.ledger = change;
        self
    }

    pub fn with_consumed(mut self, seqs: impl IntoIterator<Item = u64>) -> Self {
        self.consumed.extend(seqs);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
            && self.challenges.is_empty()
            && self.ledger.is_empty()
            && self.consumed.is_empty()
    }
}

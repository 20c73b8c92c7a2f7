use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use glide_commitment::compute_root;
use glide_db::{ChangeSet, RollupStore};
use glide_ledger::Ledger;
use glide_primitives::{
    Batch, BatchId, BatchStatus, Challenge, ChallengeId, Role, SettlementDomain, Transaction,
    TransactionError,
};
use parking_lot::{Mutex, RwLock};
use tracing::{info, instrument};

use crate::collaborators::{Authorizer, Clock, SettlementLayer};
use crate::config::RollupConfig;
use crate::error::RollupError;

/// Services the rollup consults but does not own.
#[derive(Clone)]
pub struct Collaborators {
    pub clock: Arc<dyn Clock>,
    pub authorizer: Arc<dyn Authorizer>,
    pub settlement: Arc<dyn SettlementLayer>,
}

/// The rollup core.
///
/// Locks are always taken in the order batch, challenges, ledger. Each batch
/// has its own mutex so transitions on one batch serialize while different
/// batches proceed in parallel. The ledger mutex is held from the moment a
/// change is computed until it is both persisted and applied.
pub struct Rollup<Db: RollupStore> {
    pub(crate) config: RollupConfig,
    pub(crate) store: Arc<Db>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) authorizer: Arc<dyn Authorizer>,
    pub(crate) settlement: Arc<dyn SettlementLayer>,
    pub(crate) batches: RwLock<BTreeMap<BatchId, Arc<Mutex<Batch>>>>,
    pub(crate) challenges: RwLock<BTreeMap<ChallengeId, Challenge>>,
    pub(crate) ledger: Mutex<Ledger>,
    pub(crate) cut_lock: Mutex<()>,
}

impl<Db: RollupStore> Rollup<Db> {
    /// Builds the rollup from whatever `store` already holds.
    ///
    /// Every stored batch must reproduce its root from its leaves, and every
    /// stored challenge must point at a known batch.
    pub fn new(
        config: RollupConfig,
        store: Arc<Db>,
        collaborators: Collaborators,
    ) -> Result<Self, RollupError> {
        let batches = store.load_batches().map_err(RollupError::Storage)?;
        let challenges = store.load_challenges().map_err(RollupError::Storage)?;
        let balances = store.load_balances().map_err(RollupError::Storage)?;

        let mut batch_map = BTreeMap::new();
        for batch in batches {
            check_batch_integrity(&batch)?;
            batch_map.insert(batch.id, batch);
        }

        let mut challenge_map = BTreeMap::new();
        let mut contested = BTreeSet::new();
        for challenge in challenges {
            let Some(batch) = batch_map.get(&challenge.batch_id) else {
                return Err(RollupError::CorruptState(format!(
                    "challenge {} references unknown batch {}",
                    challenge.id, challenge.batch_id
                )));
            };
            if challenge.is_pending() {
                if batch.status != BatchStatus::Verified {
                    return Err(RollupError::CorruptState(format!(
                        "challenge {} is pending against {} batch {}",
                        challenge.id, batch.status, batch.id
                    )));
                }
                if !contested.insert(challenge.batch_id) {
                    return Err(RollupError::CorruptState(format!(
                        "batch {} has more than one pending challenge",
                        challenge.batch_id
                    )));
                }
            }
            challenge_map.insert(challenge.id, challenge);
        }

        info!(
            batches = batch_map.len(),
            challenges = challenge_map.len(),
            balances = balances.len(),
            "Recovered rollup state"
        );

        Ok(Self {
            config,
            store,
            clock: collaborators.clock,
            authorizer: collaborators.authorizer,
            settlement: collaborators.settlement,
            batches: RwLock::new(
                batch_map
                    .into_iter()
                    .map(|(id, batch)| (id, Arc::new(Mutex::new(batch))))
                    .collect(),
            ),
            challenges: RwLock::new(challenge_map),
            ledger: Mutex::new(Ledger::from_balances(balances)),
            cut_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &RollupConfig {
        &self.config
    }

    pub fn domain(&self) -> SettlementDomain {
        self.config.domain()
    }

    /// Validates a transfer and places it on the queue for the next cut.
    #[instrument(level = "debug", skip(self), err)]
    pub fn submit_transaction(&self, tx: Transaction) -> Result<(), RollupError> {
        tx.validate()?;
        self.store
            .enqueue_transaction(tx)
            .map_err(RollupError::Storage)
    }

    /// Credits `address` in the configured domain for funds locked on the
    /// settlement chain. Returns the new balance.
    #[instrument(level = "debug", skip(self), err)]
    pub fn record_deposit(
        &self,
        caller: Address,
        address: Address,
        amount: U256,
    ) -> Result<U256, RollupError> {
        self.authorize(&caller, Role::Operator)?;
        if amount.is_zero() {
            return Err(TransactionError::ZeroAmount.into());
        }
        let domain = self.domain();
        let mut ledger = self.ledger.lock();
        let mut staged = ledger.stage();
        staged.credit(address, domain, amount)?;
        let balance = staged.balance_of(&address, &domain);
        let change = staged.into_change();

        self.store
            .commit(&ChangeSet::new().with_ledger(change.clone()))
            .map_err(RollupError::Storage)?;
        ledger.commit(&change);
        info!(%address, %amount, %balance, "Recorded deposit");
        Ok(balance)
    }

    /// Debits `address` for funds released on the settlement chain. Returns
    /// the new balance.
    #[instrument(level = "debug", skip(self), err)]
    pub fn record_withdrawal(
        &self,
        caller: Address,
        address: Address,
        amount: U256,
    ) -> Result<U256, RollupError> {
        self.authorize(&caller, Role::Operator)?;
        if amount.is_zero() {
            return Err(TransactionError::ZeroAmount.into());
        }
        let domain = self.domain();
        let mut ledger = self.ledger.lock();
        let mut staged = ledger.stage();
        staged.debit(address, domain, amount)?;
        let balance = staged.balance_of(&address, &domain);
        let change = staged.into_change();

        self.store
            .commit(&ChangeSet::new().with_ledger(change.clone()))
            .map_err(RollupError::Storage)?;
        ledger.commit(&change);
        info!(%address, %amount, %balance, "Recorded withdrawal");
        Ok(balance)
    }

    pub fn get_batch(&self, id: BatchId) -> Result<Batch, RollupError> {
        let handle = self.batch_handle(id)?;
        let batch = handle.lock().clone();
        Ok(batch)
    }

    pub fn list_batches(&self) -> Vec<Batch> {
        self.batch_handles()
            .into_iter()
            .map(|handle| handle.lock().clone())
            .collect()
    }

    /// Batches in which `address` sends or receives.
    pub fn batches_for_address(&self, address: &Address) -> Vec<Batch> {
        self.batch_handles()
            .into_iter()
            .filter_map(|handle| {
                let batch = handle.lock();
                batch.involves(address).then(|| batch.clone())
            })
            .collect()
    }

    pub fn get_challenge(&self, id: ChallengeId) -> Result<Challenge, RollupError> {
        self.challenges
            .read()
            .get(&id)
            .cloned()
            .ok_or(RollupError::ChallengeNotFound(id))
    }

    pub fn challenges_for_batch(&self, batch_id: BatchId) -> Vec<Challenge> {
        self.challenges
            .read()
            .values()
            .filter(|challenge| challenge.batch_id == batch_id)
            .cloned()
            .collect()
    }

    pub fn pending_transaction_count(&self) -> Result<usize, RollupError> {
        self.store.pending_count().map_err(RollupError::Storage)
    }

    pub fn get_balance(&self, address: &Address, domain: &SettlementDomain) -> U256 {
        self.ledger.lock().balance_of(address, domain)
    }

    pub fn total_balance(&self, domain: &SettlementDomain) -> Result<U256, RollupError> {
        self.ledger
            .lock()
            .total_balance(domain)
            .ok_or_else(|| RollupError::CorruptState(format!("total balance of {domain} overflows")))
    }

    pub(crate) fn authorize(&self, address: &Address, role: Role) -> Result<(), RollupError> {
        if !self.authorizer.is_authorized(address, role) {
            return Err(RollupError::Unauthorized {
                address: *address,
                role,
            });
        }
        Ok(())
    }

    pub(crate) fn batch_handle(&self, id: BatchId) -> Result<Arc<Mutex<Batch>>, RollupError> {
        self.batches
            .read()
            .get(&id)
            .cloned()
            .ok_or(RollupError::BatchNotFound(id))
    }

    fn batch_handles(&self) -> Vec<Arc<Mutex<Batch>>> {
        self.batches.read().values().cloned().collect()
    }
}

fn check_batch_integrity(batch: &Batch) -> Result<(), RollupError> {
    let root = compute_root(&batch.leaves).map_err(|e| RollupError::CorruptBatch {
        id: batch.id,
        reason: e.to_string(),
    })?;
    if root != batch.root {
        return Err(RollupError::CorruptBatch {
            id: batch.id,
            reason: "stored root does not match its leaves".to_string(),
        });
    }
    Ok(())
}

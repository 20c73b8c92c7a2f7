#![allow(dead_code)]

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use glide_db::{InMemoryStore, RollupStore};
use glide_primitives::{Batch, BatchId, SettlementDomain, Timestamp, Transaction};
use glide_rollup::{
    Collaborators, ManualClock, NoopSettlement, RoleRegistry, RolesConfig, Rollup, RollupConfig,
    SettlementLayer,
};

pub const ADMIN: Address = Address::with_last_byte(0xad);
pub const OPERATOR: Address = Address::with_last_byte(0x01);
pub const VERIFIER: Address = Address::with_last_byte(0x02);
pub const ADJUDICATOR: Address = Address::with_last_byte(0x03);
pub const CHALLENGER: Address = Address::with_last_byte(0x0c);
pub const ALICE: Address = Address::with_last_byte(0xa1);
pub const BOB: Address = Address::with_last_byte(0xb0);
pub const CAROL: Address = Address::with_last_byte(0xca);

pub const CHALLENGE_PERIOD_MS: u64 = 1_000;
pub const PENALTY: u64 = 3;
pub const START: Timestamp = Timestamp(1_000_000);

pub fn domain() -> SettlementDomain {
    SettlementDomain::new(Address::with_last_byte(0xdd))
}

pub fn rollup_config() -> RollupConfig {
    RollupConfig {
        settlement_domain: Address::with_last_byte(0xdd),
        operator: OPERATOR,
        challenge_period_ms: CHALLENGE_PERIOD_MS,
        max_batch_size: 10,
        fraud_penalty: U256::from(PENALTY),
    }
}

pub fn roles() -> Arc<RoleRegistry> {
    Arc::new(RoleRegistry::from_config(&RolesConfig {
        admin: ADMIN,
        operators: vec![OPERATOR],
        verifiers: vec![VERIFIER],
        adjudicators: vec![ADJUDICATOR],
    }))
}

pub fn transfer(from: Address, to: Address, amount: u64) -> Transaction {
    Transaction::new(from, to, U256::from(amount))
}

pub fn amount(value: u64) -> U256 {
    U256::from(value)
}

pub struct Harness<Db: RollupStore> {
    pub rollup: Rollup<Db>,
    pub store: Arc<Db>,
    pub clock: Arc<ManualClock>,
    pub roles: Arc<RoleRegistry>,
}

pub type MemoryHarness = Harness<InMemoryStore>;

pub fn collaborators(
    clock: Arc<ManualClock>,
    roles: Arc<RoleRegistry>,
    settlement: Arc<dyn SettlementLayer>,
) -> Collaborators {
    Collaborators {
        clock,
        authorizer: roles,
        settlement,
    }
}

impl<Db: RollupStore> Harness<Db> {
    pub fn with(store: Arc<Db>) -> Self {
        Self::with_settlement(store, Arc::new(NoopSettlement))
    }

    pub fn with_settlement(store: Arc<Db>, settlement: Arc<dyn SettlementLayer>) -> Self {
        let clock = Arc::new(ManualClock::new(START));
        let roles = roles();
        let rollup = Rollup::new(
            rollup_config(),
            store.clone(),
            collaborators(clock.clone(), roles.clone(), settlement),
        )
        .unwrap();
        Self {
            rollup,
            store,
            clock,
            roles,
        }
    }

    pub fn balance(&self, address: Address) -> U256 {
        self.rollup.get_balance(&address, &domain())
    }

    pub fn deposit(&self, address: Address, value: u64) {
        self.rollup
            .record_deposit(OPERATOR, address, amount(value))
            .unwrap();
    }

    pub fn cut(&self, txs: &[Transaction]) -> Batch {
        for tx in txs {
            self.rollup.submit_transaction(*tx).unwrap();
        }
        self.rollup.cut_batch().unwrap()
    }

    pub fn cut_and_verify(&self, txs: &[Transaction]) -> Batch {
        let batch = self.cut(txs);
        self.rollup.verify_batch(batch.id, VERIFIER).unwrap()
    }

    pub fn pass_challenge_period(&self) {
        self.clock.advance(CHALLENGE_PERIOD_MS);
    }
}

impl MemoryHarness {
    pub fn new() -> Self {
        Self::with(Arc::new(InMemoryStore::new()))
    }

    /// A=20, B=10, submitter and challenger able to pay the penalty.
    pub fn funded() -> Self {
        let harness = Self::new();
        harness.deposit(ALICE, 20);
        harness.deposit(BOB, 10);
        harness.deposit(OPERATOR, 100);
        harness.deposit(CHALLENGER, 100);
        harness
    }
}

/// The batch used throughout: A sends 10 to B, then B sends 5 to C.
pub fn scenario_transfers() -> Vec<Transaction> {
    vec![transfer(ALICE, BOB, 10), transfer(BOB, CAROL, 5)]
}

pub fn first_batch() -> BatchId {
    BatchId(1)
}

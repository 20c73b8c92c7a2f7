use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use glide_primitives::SettlementDomain;
use thiserror::Error;
use tracing::trace;

use crate::delta::BalanceDelta;
use crate::staged::{LedgerChange, StagedLedger};

pub type BalanceKey = (Address, SettlementDomain);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Insufficient balance for {address} in {domain}: has {balance}, needs {required}")]
    InsufficientBalance {
        address: Address,
        domain: SettlementDomain,
        balance: U256,
        required: U256,
    },
    #[error("Balance of {address} in {domain} would overflow")]
    Overflow {
        address: Address,
        domain: SettlementDomain,
    },
}

/// Committed balances. Missing entries read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    balances: BTreeMap<BalanceKey, U256>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_balances(balances: impl IntoIterator<Item = (Address, SettlementDomain, U256)>) -> Self {
        let balances = balances
            .into_iter()
            .filter(|(_, _, amount)| !amount.is_zero())
            .map(|(address, domain, amount)| ((address, domain), amount))
            .collect();
        Self { balances }
    }

    pub fn balance_of(&self, address: &Address, domain: &SettlementDomain) -> U256 {
        self.balances
            .get(&(*address, *domain))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Sum of every balance in `domain`, `None` if it does not fit in 256 bits.
    pub fn total_balance(&self, domain: &SettlementDomain) -> Option<U256> {
        self.balances
            .iter()
            .filter(|((_, d), _)| d == domain)
            .try_fold(U256::ZERO, |acc, (_, amount)| acc.checked_add(*amount))
    }

    pub fn balances(&self) -> impl Iterator<Item = (Address, SettlementDomain, U256)> + '_ {
        self.balances
            .iter()
            .map(|((address, domain), amount)| (*address, *domain, *amount))
    }

    pub fn stage(&self) -> StagedLedger<'_> {
        StagedLedger::new(self)
    }

    /// Applies a change computed by [`StagedLedger`] against this ledger.
    pub fn commit(&mut self, change: &LedgerChange) {
        for (address, domain, amount) in &change.balances {
            trace!(%address, %domain, %amount, "Committing balance");
            if amount.is_zero() {
                self.balances.remove(&(*address, *domain));
            } else {
                self.balances.insert((*address, *domain), *amount);
            }
        }
    }

    /// Stages and commits a single delta.
    pub fn apply(&mut self, delta: &BalanceDelta) -> Result<(), LedgerError> {
        let mut staged = self.stage();
        staged.apply(delta)?;
        let change = staged.into_change();
        self.commit(&change);
        Ok(())
    }
}

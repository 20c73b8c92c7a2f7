use alloy_primitives::{Address, U256};
use glide_primitives::SettlementDomain;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum Delta {
    Credit(U256),
    Debit(U256),
}

impl Delta {
    pub fn inverse(self) -> Self {
        match self {
            Delta::Credit(amount) => Delta::Debit(amount),
            Delta::Debit(amount) => Delta::Credit(amount),
        }
    }

    pub fn amount(&self) -> U256 {
        match self {
            Delta::Credit(amount) | Delta::Debit(amount) => *amount,
        }
    }
}

/// A signed change to a single balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub address: Address,
    pub domain: SettlementDomain,
    pub delta: Delta,
}

impl BalanceDelta {
    pub fn credit(address: Address, domain: SettlementDomain, amount: U256) -> Self {
        Self {
            address,
            domain,
            delta: Delta::Credit(amount),
        }
    }

    pub fn debit(address: Address, domain: SettlementDomain, amount: U256) -> Self {
        Self {
            address,
            domain,
            delta: Delta::Debit(amount),
        }
    }

    pub fn inverse(&self) -> Self {
        Self {
            delta: self.delta.inverse(),
            ..*self
        }
    }
}

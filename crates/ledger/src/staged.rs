use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use glide_primitives::{SettlementDomain, Transaction};

use crate::delta::{BalanceDelta, Delta};
use crate::ledger::{BalanceKey, Ledger, LedgerError};

/// Balance writes computed against a [`Ledger`] but not yet applied to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerChange {
    /// Deltas in the order they were staged.
    pub deltas: Vec<BalanceDelta>,
    /// Resulting balance of every touched key.
    pub balances: Vec<(Address, SettlementDomain, U256)>,
}

impl LedgerChange {
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty() && self.balances.is_empty()
    }

    /// Sum of all debits, `None` on overflow.
    pub fn debited_total(&self) -> Option<U256> {
        self.deltas
            .iter()
            .filter_map(|delta| match delta.delta {
                Delta::Debit(amount) => Some(amount),
                Delta::Credit(_) => None,
            })
            .try_fold(U256::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

/// Copy-on-write view over a [`Ledger`].
///
/// Every operation either fully applies to the overlay or leaves it unchanged.
#[derive(Debug)]
pub struct StagedLedger<'a> {
    base: &'a Ledger,
    overlay: BTreeMap<BalanceKey, U256>,
    deltas: Vec<BalanceDelta>,
}

impl<'a> StagedLedger<'a> {
    pub(crate) fn new(base: &'a Ledger) -> Self {
        Self {
            base,
            overlay: BTreeMap::new(),
            deltas: Vec::new(),
        }
    }

    pub fn balance_of(&self, address: &Address, domain: &SettlementDomain) -> U256 {
        self.overlay
            .get(&(*address, *domain))
            .copied()
            .unwrap_or_else(|| self.base.balance_of(address, domain))
    }

    pub fn credit(
        &mut self,
        address: Address,
        domain: SettlementDomain,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let updated = self.credited(&address, &domain, amount)?;
        self.write(BalanceDelta::credit(address, domain, amount), updated);
        Ok(())
    }

    pub fn debit(
        &mut self,
        address: Address,
        domain: SettlementDomain,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let updated = self.debited(&address, &domain, amount)?;
        self.write(BalanceDelta::debit(address, domain, amount), updated);
        Ok(())
    }

    pub fn apply(&mut self, delta: &BalanceDelta) -> Result<(), LedgerError> {
        match delta.delta {
            Delta::Credit(amount) => self.credit(delta.address, delta.domain, amount),
            Delta::Debit(amount) => self.debit(delta.address, delta.domain, amount),
        }
    }

    /// Moves `amount` from `from` to `to`. The debit and the credit land
    /// together or not at all.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        domain: SettlementDomain,
        amount: U256,
    ) -> Result<(), LedgerError> {
        let debited = self.debited(&from, &domain, amount)?;
        if from == to {
            return Ok(());
        }
        let credited = self.credited(&to, &domain, amount)?;
        self.write(BalanceDelta::debit(from, domain, amount), debited);
        self.write(BalanceDelta::credit(to, domain, amount), credited);
        Ok(())
    }

    pub fn apply_transaction(
        &mut self,
        tx: &Transaction,
        domain: SettlementDomain,
    ) -> Result<(), LedgerError> {
        self.transfer(tx.sender, tx.recipient, domain, tx.amount)
    }

    /// Undoes a transaction previously applied with [`Self::apply_transaction`].
    pub fn revert_transaction(
        &mut self,
        tx: &Transaction,
        domain: SettlementDomain,
    ) -> Result<(), LedgerError> {
        self.transfer(tx.recipient, tx.sender, domain, tx.amount)
    }

    pub fn into_change(self) -> LedgerChange {
        LedgerChange {
            deltas: self.deltas,
            balances: self
                .overlay
                .into_iter()
                .map(|((address, domain), amount)| (address, domain, amount))
                .collect(),
        }
    }

    fn credited(
        &self,
        address: &Address,
        domain: &SettlementDomain,
        amount: U256,
    ) -> Result<U256, LedgerError> {
        self.balance_of(address, domain)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow {
                address: *address,
                domain: *domain,
            })
    }

    fn debited(
        &self,
        address: &Address,
        domain: &SettlementDomain,
        amount: U256,
    ) -> Result<U256, LedgerError> {
        let balance = self.balance_of(address, domain);
        balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                address: *address,
                domain: *domain,
                balance,
                required: amount,
            })
    }

    fn write(&mut self, delta: BalanceDelta, updated: U256) {
        if delta.delta.amount().is_zero() {
            return;
        }
        self.overlay.insert((delta.address, delta.domain), updated);
        self.deltas.push(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> SettlementDomain {
        SettlementDomain::new(Address::repeat_byte(0xdd))
    }

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn funded(balance: u64) -> Ledger {
        Ledger::from_balances([(addr(0xa), domain(), U256::from(balance))])
    }

    #[test]
    fn staged_writes_are_invisible_until_commit() {
        let mut ledger = funded(20);
        let mut staged = ledger.stage();
        staged
            .transfer(addr(0xa), addr(0xb), domain(), U256::from(10u64))
            .unwrap();
        assert_eq!(staged.balance_of(&addr(0xb), &domain()), U256::from(10u64));
        let change = staged.into_change();

        assert_eq!(ledger.balance_of(&addr(0xb), &domain()), U256::ZERO);
        ledger.commit(&change);
        assert_eq!(ledger.balance_of(&addr(0xa), &domain()), U256::from(10u64));
        assert_eq!(ledger.balance_of(&addr(0xb), &domain()), U256::from(10u64));
    }

    #[test]
    fn sequential_transfers_see_earlier_effects() {
        let ledger = funded(20);
        let mut staged = ledger.stage();
        let txs = [
            Transaction::new(addr(0xa), addr(0xb), U256::from(10u64)),
            Transaction::new(addr(0xb), addr(0xc), U256::from(5u64)),
        ];
        for tx in &txs {
            staged.apply_transaction(tx, domain()).unwrap();
        }
        assert_eq!(staged.balance_of(&addr(0xa), &domain()), U256::from(10u64));
        assert_eq!(staged.balance_of(&addr(0xb), &domain()), U256::from(5u64));
        assert_eq!(staged.balance_of(&addr(0xc), &domain()), U256::from(5u64));

        for tx in txs.iter().rev() {
            staged.revert_transaction(tx, domain()).unwrap();
        }
        assert_eq!(staged.balance_of(&addr(0xa), &domain()), U256::from(20u64));
        assert_eq!(staged.balance_of(&addr(0xc), &domain()), U256::ZERO);
    }

    #[test]
    fn debited_total_counts_each_transfer_once() {
        let ledger = funded(20);
        let mut staged = ledger.stage();
        staged
            .apply_transaction(
                &Transaction::new(addr(0xa), addr(0xb), U256::from(10u64)),
                domain(),
            )
            .unwrap();
        staged
            .apply_transaction(
                &Transaction::new(addr(0xb), addr(0xc), U256::from(5u64)),
                domain(),
            )
            .unwrap();
        let change = staged.into_change();
        assert_eq!(change.deltas.len(), 4);
        assert_eq!(change.debited_total(), Some(U256::from(15u64)));
        assert_eq!(LedgerChange::default().debited_total(), Some(U256::ZERO));
    }

    #[test]
    fn failed_transfer_leaves_overlay_unchanged() {
        let ledger = funded(3);
        let mut staged = ledger.stage();
        let err = staged
            .transfer(addr(0xa), addr(0xb), domain(), U256::from(4u64))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                address: addr(0xa),
                domain: domain(),
                balance: U256::from(3u64),
                required: U256::from(4u64),
            }
        );
        assert!(staged.into_change().is_empty());
    }

    #[test]
    fn credit_overflow_does_not_debit_sender() {
        let ledger = Ledger::from_balances([
            (addr(0xa), domain(), U256::from(1u64)),
            (addr(0xb), domain(), U256::MAX),
        ]);
        let mut staged = ledger.stage();
        assert!(matches!(
            staged.transfer(addr(0xa), addr(0xb), domain(), U256::from(1u64)),
            Err(LedgerError::Overflow { .. })
        ));
        assert_eq!(staged.balance_of(&addr(0xa), &domain()), U256::from(1u64));
    }

    #[test]
    fn zero_amounts_are_not_recorded() {
        let ledger = Ledger::new();
        let mut staged = ledger.stage();
        staged.credit(addr(1), domain(), U256::ZERO).unwrap();
        staged.debit(addr(1), domain(), U256::ZERO).unwrap();
        assert!(staged.into_change().is_empty());
    }
}

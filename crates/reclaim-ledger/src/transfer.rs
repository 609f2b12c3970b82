//! In-memory [`ValueTransfer`]: an account book of everything paid out.
//!
//! Used by tests and by tools that replay a ledger without a real chain.
//! Failures can be injected for the whole book or for a single recipient.

use std::collections::{HashMap, HashSet};

use reclaim_core::error::LedgerError;
use reclaim_core::eth::EthAddress;
use reclaim_core::traits::{Payout, ValueTransfer};
use reclaim_core::types::Amount;

#[derive(Debug, Default, Clone)]
pub struct MemoryTransfer {
    balances: HashMap<EthAddress, Amount>,
    received: Amount,
    history: Vec<Payout>,
    fail_all: bool,
    failing: HashSet<EthAddress>,
}

impl MemoryTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total paid to `addr` so far.
    pub fn balance_of(&self, addr: &EthAddress) -> Amount {
        self.balances.get(addr).copied().unwrap_or(0)
    }

    /// Total taken into custody via [`ValueTransfer::receive`].
    pub fn total_received(&self) -> Amount {
        self.received
    }

    pub fn total_paid(&self) -> Amount {
        self.history
            .iter()
            .fold(0, |acc: Amount, p| acc.saturating_add(p.amount))
    }

    /// Every payout in settlement order.
    pub fn history(&self) -> &[Payout] {
        &self.history
    }

    /// Make every subsequent `receive` and `settle` fail.
    pub fn set_fail_all(&mut self, fail: bool) {
        self.fail_all = fail;
    }

    /// Make any batch paying `addr` fail.
    pub fn fail_for(&mut self, addr: EthAddress) {
        self.failing.insert(addr);
    }

    pub fn clear_failures(&mut self) {
        self.fail_all = false;
        self.failing.clear();
    }
}

impl ValueTransfer for MemoryTransfer {
    fn receive(&mut self, amount: Amount) -> Result<(), LedgerError> {
        if self.fail_all {
            return Err(LedgerError::TransferFailed("receive rejected".into()));
        }
        self.received = self
            .received
            .checked_add(amount)
            .ok_or_else(|| LedgerError::TransferFailed("custody total overflow".into()))?;
        Ok(())
    }

    fn settle(&mut self, batch: &[Payout]) -> Result<(), LedgerError> {
        if self.fail_all {
            return Err(LedgerError::TransferFailed("settlement rejected".into()));
        }
        if let Some(p) = batch.iter().find(|p| self.failing.contains(&p.to)) {
            return Err(LedgerError::TransferFailed(format!("recipient {} rejected", p.to)));
        }

        // Validate the whole batch before touching any balance.
        let mut updated: HashMap<EthAddress, Amount> = HashMap::new();
        for p in batch {
            let current = updated
                .get(&p.to)
                .copied()
                .unwrap_or_else(|| self.balance_of(&p.to));
            let next = current
                .checked_add(p.amount)
                .ok_or_else(|| LedgerError::TransferFailed(format!("balance overflow for {}", p.to)))?;
            updated.insert(p.to, next);
        }

        self.balances.extend(updated);
        self.history.extend_from_slice(batch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> EthAddress {
        EthAddress([b; 20])
    }

    #[test]
    fn settle_credits_each_recipient() {
        let mut t = MemoryTransfer::new();
        t.settle(&[
            Payout { to: addr(1), amount: 10 },
            Payout { to: addr(2), amount: 5 },
            Payout { to: addr(1), amount: 1 },
        ])
        .unwrap();
        assert_eq!(t.balance_of(&addr(1)), 11);
        assert_eq!(t.balance_of(&addr(2)), 5);
        assert_eq!(t.total_paid(), 16);
        assert_eq!(t.history().len(), 3);
    }

    #[test]
    fn receive_accumulates() {
        let mut t = MemoryTransfer::new();
        t.receive(7).unwrap();
        t.receive(3).unwrap();
        assert_eq!(t.total_received(), 10);
    }

    #[test]
    fn failing_recipient_moves_nothing() {
        let mut t = MemoryTransfer::new();
        t.fail_for(addr(2));
        let err = t
            .settle(&[Payout { to: addr(1), amount: 10 }, Payout { to: addr(2), amount: 5 }])
            .unwrap_err();
        assert!(matches!(err, LedgerError::TransferFailed(_)));
        assert_eq!(t.balance_of(&addr(1)), 0);
        assert!(t.history().is_empty());
    }

    #[test]
    fn overflow_moves_nothing() {
        let mut t = MemoryTransfer::new();
        t.settle(&[Payout { to: addr(1), amount: u128::MAX }]).unwrap();
        assert!(t
            .settle(&[Payout { to: addr(2), amount: 1 }, Payout { to: addr(1), amount: 1 }])
            .is_err());
        assert_eq!(t.balance_of(&addr(2)), 0);
        assert_eq!(t.history().len(), 1);
    }

    #[test]
    fn fail_all_then_clear() {
        let mut t = MemoryTransfer::new();
        t.set_fail_all(true);
        assert!(t.receive(1).is_err());
        assert!(t.settle(&[]).is_err());
        t.clear_failures();
        assert!(t.receive(1).is_ok());
    }
}

//! Serialized access to a shared [`ClaimLedger`].
//!
//! All mutations go through one mutex. Signature recovery for a claim runs
//! outside the lock; the row is then settled with compare-and-zero, so two
//! concurrent claims for the same address cannot both pay.

use std::sync::Arc;

use parking_lot::Mutex;

use reclaim_core::error::{LedgerError, ReclaimError};
use reclaim_core::traits::{Clock, ValueTransfer};
use reclaim_core::types::{Amount, DilutionStage, Hash160, Timestamp};

use crate::ledger::{ClaimLedger, ClaimReceipt, ClaimRequest, DilutionReceipt, verify_claim};

pub struct LedgerService<T: ValueTransfer> {
    ledger: Arc<Mutex<ClaimLedger<T>>>,
    clock: Arc<dyn Clock>,
}

impl<T: ValueTransfer> Clone for LedgerService<T> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<T: ValueTransfer> LedgerService<T> {
    pub fn new(ledger: ClaimLedger<T>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            clock,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn fund(&self, hash: Hash160, amount: Amount) -> Result<(), ReclaimError> {
        self.ledger.lock().fund(hash, amount)
    }

    /// Claim with the clock read once at entry.
    pub fn claim(&self, request: &ClaimRequest) -> Result<ClaimReceipt, ReclaimError> {
        let now = self.clock.now();

        let (raw, settings) = {
            let ledger = self.ledger.lock();
            let raw = ledger.current_balance(&request.legacy_address);
            if raw == 0 {
                return Err(LedgerError::ClaimErrorNoBalance(
                    request
                        .legacy_address
                        .with_version(ledger.settings().legacy_version)
                        .to_string(),
                )
                .into());
            }
            (raw, ledger.settings().clone())
        };

        verify_claim(&settings, request)?;

        self.ledger
            .lock()
            .settle_claim(&request.legacy_address, raw, request.target, now)
    }

    pub fn dilute(&self, stage: DilutionStage) -> Result<DilutionReceipt, ReclaimError> {
        let now = self.clock.now();
        self.ledger.lock().dilute(stage, now)
    }

    pub fn current_stage(&self) -> DilutionStage {
        self.ledger.lock().current_stage()
    }

    pub fn pool_total(&self) -> Amount {
        self.ledger.lock().pool_total()
    }

    pub fn custody_balance(&self) -> Amount {
        self.ledger.lock().custody_balance()
    }

    pub fn balance_of(&self, hash: &Hash160) -> Amount {
        self.ledger.lock().balance_of(hash)
    }

    /// Run `f` with the ledger locked.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&ClaimLedger<T>) -> R) -> R {
        f(&self.ledger.lock())
    }

    pub fn with_ledger_mut<R>(&self, f: impl FnOnce(&mut ClaimLedger<T>) -> R) -> R {
        f(&mut self.ledger.lock())
    }
}

//! Trait interfaces between crates.
//!
//! - [`DilutionCalculator`]: dilution fraction math (reclaim-dilution implements)
//! - [`ValueTransfer`]: moving value out of custody (reclaim-ledger provides an in-memory one)
//! - [`Clock`]: wall-clock source for time-gated operations

use crate::constants::BPS_PRECISION;
use crate::error::{DilutionError, LedgerError};
use crate::eth::EthAddress;
use crate::types::{Amount, DilutionStage, PotSplit, Timestamp};

/// Pure computation of retained fractions, forfeits, and pot splits.
///
/// All math is integer-only with checked arithmetic.
pub trait DilutionCalculator: Send + Sync {
    /// Retained fraction of a raw balance once `stage` has fired, in basis points.
    fn retained_bps(&self, stage: DilutionStage) -> u128;

    /// Amount payable to a claimant holding `raw` when `stage` is current.
    ///
    /// Default implementation: `raw * retained_bps(stage) / BPS_PRECISION`, floored.
    fn payout(&self, raw: Amount, stage: DilutionStage) -> Result<Amount, DilutionError> {
        raw.checked_mul(self.retained_bps(stage))
            .map(|v| v / BPS_PRECISION)
            .ok_or(DilutionError::ArithmeticOverflow)
    }

    /// Value forfeited from an unclaimed `pool` when moving into `stage` from
    /// its predecessor.
    fn forfeit(&self, pool: Amount, stage: DilutionStage) -> Result<Amount, DilutionError>;

    /// Divide a forfeited amount between the two beneficiary pots.
    fn split(&self, delta: Amount) -> PotSplit;
}

/// A single outgoing transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Payout {
    pub to: EthAddress,
    pub amount: Amount,
}

/// Moves value in and out of the ledger's custody.
///
/// Both operations are all-or-nothing: on `Err`, no value has moved.
pub trait ValueTransfer: Send {
    /// Take `amount` into custody to back a newly funded row.
    fn receive(&mut self, amount: Amount) -> Result<(), LedgerError>;

    /// Pay out every entry of `batch`, or none of them.
    fn settle(&mut self, batch: &[Payout]) -> Result<(), LedgerError>;
}

/// Source of the current time in Unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

//! Dilution engine implementing the [`DilutionCalculator`] trait.
//!
//! Each stage forfeits the drop in retained fraction, applied to the whole
//! unclaimed pool: 25% at stage 1, another 25% at stage 2, the final 50% at
//! stage 3. Forfeits are split evenly between the reinsert pot and the DAO
//! pot, with any odd unit going to the DAO pot.

use reclaim_core::constants::BPS_PRECISION;
use reclaim_core::error::DilutionError;
use reclaim_core::traits::DilutionCalculator;
use reclaim_core::types::{Amount, DilutionStage, PotSplit};

#[derive(Debug, Clone, Default)]
pub struct DilutionEngine;

impl DilutionEngine {
    pub fn new() -> Self {
        Self
    }
}

impl DilutionCalculator for DilutionEngine {
    fn retained_bps(&self, stage: DilutionStage) -> u128 {
        stage.retained_bps()
    }

    fn forfeit(&self, pool: Amount, stage: DilutionStage) -> Result<Amount, DilutionError> {
        let Some(previous) = stage.previous() else {
            return Ok(0);
        };

        let step_bps = self
            .retained_bps(previous)
            .checked_sub(self.retained_bps(stage))
            .ok_or(DilutionError::ArithmeticOverflow)?;

        pool.checked_mul(step_bps)
            .map(|v| v / BPS_PRECISION)
            .ok_or(DilutionError::ArithmeticOverflow)
    }

    fn split(&self, delta: Amount) -> PotSplit {
        let reinsert = delta / 2;
        PotSplit {
            reinsert,
            dao: delta - reinsert,
        }
    }
}

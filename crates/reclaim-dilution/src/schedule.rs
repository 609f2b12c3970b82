//! Dilution thresholds and the gate that decides whether a stage may fire.

use serde::{Deserialize, Serialize};

use reclaim_core::constants::{DILUTE1_OFFSET_SECS, DILUTE2_OFFSET_SECS, DILUTE3_OFFSET_SECS};
use reclaim_core::error::DilutionError;
use reclaim_core::types::{DilutionStage, Timestamp};

/// The three stage thresholds `t1 < t2 < t3`, in Unix seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[Timestamp; 3]", into = "[Timestamp; 3]")]
pub struct DilutionSchedule {
    t1: Timestamp,
    t2: Timestamp,
    t3: Timestamp,
}

impl DilutionSchedule {
    pub fn new(t1: Timestamp, t2: Timestamp, t3: Timestamp) -> Result<Self, DilutionError> {
        if !(t1 < t2 && t2 < t3) {
            return Err(DilutionError::InvalidSchedule(format!(
                "thresholds must be strictly increasing: {t1}, {t2}, {t3}"
            )));
        }
        Ok(Self { t1, t2, t3 })
    }

    /// Thresholds at the standard offsets from a deployment time:
    /// 92 days, 183 days, and 1826 days.
    pub fn from_deployment(deployed_at: Timestamp) -> Result<Self, DilutionError> {
        let at = |offset: u64| {
            deployed_at
                .checked_add(offset)
                .ok_or(DilutionError::ArithmeticOverflow)
        };
        Self::new(
            at(DILUTE1_OFFSET_SECS)?,
            at(DILUTE2_OFFSET_SECS)?,
            at(DILUTE3_OFFSET_SECS)?,
        )
    }

    /// Threshold of `stage`. `Active` has none.
    pub fn threshold(&self, stage: DilutionStage) -> Option<Timestamp> {
        match stage {
            DilutionStage::Active => None,
            DilutionStage::Stage1 => Some(self.t1),
            DilutionStage::Stage2 => Some(self.t2),
            DilutionStage::Stage3 => Some(self.t3),
        }
    }

    pub fn timestamps(&self) -> [Timestamp; 3] {
        [self.t1, self.t2, self.t3]
    }

    /// Latest stage whose threshold has passed at `now`, ignoring whether
    /// anyone has fired it.
    pub fn stage_due_at(&self, now: Timestamp) -> DilutionStage {
        if now >= self.t3 {
            DilutionStage::Stage3
        } else if now >= self.t2 {
            DilutionStage::Stage2
        } else if now >= self.t1 {
            DilutionStage::Stage1
        } else {
            DilutionStage::Active
        }
    }

    /// The stepwise wall-clock retained fraction, in basis points.
    pub fn retained_bps_at(&self, now: Timestamp) -> u128 {
        self.stage_due_at(now).retained_bps()
    }

    /// Seconds from `now` until `stage` may fire; zero once due.
    pub fn seconds_until(&self, stage: DilutionStage, now: Timestamp) -> u64 {
        self.threshold(stage)
            .map(|t| t.saturating_sub(now))
            .unwrap_or(0)
    }

    /// Check that `target` may fire at `now` given the last fired stage.
    ///
    /// `Active` is never a valid target. Otherwise checks run in order:
    /// already fired, predecessor not fired, threshold not reached.
    pub fn check_fire(
        &self,
        fired: DilutionStage,
        target: DilutionStage,
        now: Timestamp,
    ) -> Result<(), DilutionError> {
        if target == DilutionStage::Active {
            return Err(DilutionError::NotADilutionStage(target));
        }
        if fired >= target {
            return Err(DilutionError::DiluteAlreadyHappened(target.index()));
        }

        // target > fired >= Active, so target has a predecessor
        let required = target.previous().unwrap_or(DilutionStage::Active);
        if fired < required {
            return Err(DilutionError::DiluteOutOfOrder {
                stage: target.index(),
                required: required.index(),
            });
        }

        let threshold = self.threshold(target).unwrap_or(0);
        if now < threshold {
            return Err(DilutionError::DiluteTimeNotReached {
                stage: target.index(),
                threshold,
                now,
            });
        }
        Ok(())
    }
}

impl TryFrom<[Timestamp; 3]> for DilutionSchedule {
    type Error = DilutionError;

    fn try_from(ts: [Timestamp; 3]) -> Result<Self, Self::Error> {
        Self::new(ts[0], ts[1], ts[2])
    }
}

impl From<DilutionSchedule> for [Timestamp; 3] {
    fn from(s: DilutionSchedule) -> Self {
        s.timestamps()
    }
}

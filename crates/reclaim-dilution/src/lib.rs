//! # reclaim-dilution: three-stage forfeiture of unclaimed balances.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! - **Schedule**: thresholds `t1 < t2 < t3`, derived from the deployment
//!   time or given explicitly. A stage fires only after its threshold and
//!   only after its predecessor.
//! - **Retained fractions**: 100% while active, then 75%, 50%, 0%.
//! - **Forfeits**: each stage moves the drop in retained fraction of the
//!   current unclaimed pool to the two beneficiary pots, split evenly.

pub mod engine;
pub mod schedule;

pub use engine::DilutionEngine;
pub use reclaim_core::types::{DilutionStage, PotSplit};
pub use schedule::DilutionSchedule;

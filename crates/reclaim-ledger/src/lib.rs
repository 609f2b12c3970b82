//! # reclaim-ledger: claim bookkeeping for legacy balances.
//!
//! - [`ledger::ClaimLedger`]: funded rows, at-most-once claims, and the
//!   three dilution stages.
//! - [`service::LedgerService`]: the ledger behind a mutex with a clock.
//! - [`snapshot`]: importing legacy balance snapshots.
//! - [`config::LedgerConfig`]: layered file and environment configuration.

pub mod amount;
pub mod clock;
pub mod config;
pub mod ledger;
pub mod service;
pub mod snapshot;
pub mod transfer;

pub use clock::{ManualClock, SystemClock};
pub use config::LedgerConfig;
pub use ledger::{ClaimLedger, ClaimReceipt, ClaimRequest, ClaimSettings, DilutionReceipt, verify_claim};
pub use service::LedgerService;
pub use snapshot::{BalanceSnapshot, FillReport, SnapshotEntry, SnapshotSummary};
pub use transfer::MemoryTransfer;

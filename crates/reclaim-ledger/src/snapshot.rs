//! Balance snapshots of the legacy chain and bulk funding from them.
//!
//! A snapshot is JSON:
//!
//! ```json
//! { "block": 123, "hash": "...", "balances": [ { "dmdv3Address": "d...", "value": "1000" } ] }
//! ```
//!
//! `legacyAddress` is accepted in place of `dmdv3Address`. Values are base
//! units as decimal strings (an empty string is zero).

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use reclaim_core::address::LegacyAddress;
use reclaim_core::error::{LedgerError, ReclaimError};
use reclaim_core::traits::ValueTransfer;
use reclaim_core::types::Amount;

use crate::ledger::ClaimLedger;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    #[serde(rename = "legacyAddress", alias = "dmdv3Address", alias = "legacy_address")]
    pub legacy_address: String,
    #[serde(default, with = "crate::amount")]
    pub value: Amount,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    pub balances: Vec<SnapshotEntry>,
}

/// Totals over a snapshot, without touching a ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub entries: usize,
    #[serde(with = "crate::amount")]
    pub total: Amount,
    pub dust: usize,
    #[serde(with = "crate::amount")]
    pub dust_total: Amount,
    pub duplicates: Vec<String>,
    pub invalid: Vec<String>,
}

/// What [`BalanceSnapshot::fill_ledger`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    pub funded: usize,
    #[serde(with = "crate::amount")]
    pub funded_total: Amount,
    pub dust: usize,
    /// Addresses seen twice in the snapshot or already funded.
    pub duplicates: Vec<String>,
    /// Entries whose address did not decode.
    pub invalid: Vec<String>,
}

enum Triage {
    Fund(LegacyAddress, Amount),
    Dust(Amount),
    Duplicate,
    Invalid,
}

impl BalanceSnapshot {
    pub fn from_json(json: &str) -> Result<Self, ReclaimError> {
        serde_json::from_str(json).map_err(|e| ReclaimError::Snapshot(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ReclaimError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ReclaimError::Snapshot(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, ReclaimError> {
        serde_json::to_string_pretty(self).map_err(|e| ReclaimError::Snapshot(e.to_string()))
    }

    fn triage<'a>(&'a self, min_value: Amount) -> impl Iterator<Item = (&'a SnapshotEntry, Triage)> + 'a {
        let mut seen = HashSet::new();
        self.balances.iter().map(move |entry| {
            // Only a funded entry claims its address; dust never shadows a later real balance.
            let triage = match LegacyAddress::decode(entry.legacy_address.trim()) {
                Err(_) => Triage::Invalid,
                Ok(address) if seen.contains(&address.hash160()) => Triage::Duplicate,
                Ok(_) if entry.value == 0 || entry.value < min_value => Triage::Dust(entry.value),
                Ok(address) => {
                    seen.insert(address.hash160());
                    Triage::Fund(address, entry.value)
                }
            };
            (entry, triage)
        })
    }

    pub fn summarize(&self, min_value: Amount) -> SnapshotSummary {
        let mut summary = SnapshotSummary {
            entries: self.balances.len(),
            ..Default::default()
        };
        for (entry, triage) in self.triage(min_value) {
            match triage {
                Triage::Fund(_, value) => summary.total = summary.total.saturating_add(value),
                Triage::Dust(value) => {
                    summary.dust += 1;
                    summary.dust_total = summary.dust_total.saturating_add(value);
                }
                Triage::Duplicate => summary.duplicates.push(entry.legacy_address.clone()),
                Triage::Invalid => summary.invalid.push(entry.legacy_address.clone()),
            }
        }
        summary
    }

    /// Fund one ledger row per usable entry.
    ///
    /// Dust, duplicates and undecodable addresses are skipped and reported.
    /// Any other funding failure aborts the fill; rows funded before it stay.
    pub fn fill_ledger<T: ValueTransfer>(
        &self,
        ledger: &mut ClaimLedger<T>,
        min_value: Amount,
    ) -> Result<FillReport, ReclaimError> {
        let mut report = FillReport::default();
        for (entry, triage) in self.triage(min_value) {
            match triage {
                Triage::Fund(address, value) => match ledger.fund(address.hash160(), value) {
                    Ok(()) => {
                        report.funded += 1;
                        report.funded_total = report.funded_total.saturating_add(value);
                    }
                    Err(ReclaimError::Ledger(LedgerError::AccountAlreadyDefined(_))) => {
                        report.duplicates.push(entry.legacy_address.clone());
                    }
                    Err(e) => return Err(e),
                },
                Triage::Dust(_) => report.dust += 1,
                Triage::Duplicate => report.duplicates.push(entry.legacy_address.clone()),
                Triage::Invalid => {
                    warn!(address = %entry.legacy_address, "skipping undecodable snapshot address");
                    report.invalid.push(entry.legacy_address.clone());
                }
            }
        }
        info!(
            funded = report.funded,
            total = report.funded_total,
            dust = report.dust,
            duplicates = report.duplicates.len(),
            invalid = report.invalid.len(),
            "snapshot loaded into ledger"
        );
        Ok(report)
    }
}

//! Ledger configuration.
//!
//! Provides [`LedgerConfig`] with defaults matching a test deployment. Values
//! are layered: built-in defaults, then an optional file (format chosen by
//! extension), then `RECLAIM_*` environment variables.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use reclaim_core::constants::{DEFAULT_MIN_SNAPSHOT_VALUE, VERSION_DIAMOND};
use reclaim_core::error::{DilutionError, LedgerError, ReclaimError};
use reclaim_core::eth::EthAddress;
use reclaim_core::message::SigningScheme;
use reclaim_core::signature::SignaturePolicy;
use reclaim_core::types::{Amount, Beneficiaries, Timestamp};
use reclaim_dilution::DilutionSchedule;

/// Environment variable prefix, e.g. `RECLAIM_CLAIM_PREFIX`.
pub const ENV_PREFIX: &str = "RECLAIM";

/// Reinsert pot used when none is configured.
pub const DEFAULT_REINSERT_POT: &str = "0x2000000000000000000000000000000000000001";
/// DAO pot used when none is configured.
pub const DEFAULT_DAO_POT: &str = "0xDA0da0da0Da0Da0Da0DA00DA0da0da0DA0DA0dA0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Text signed before the checksummed target address.
    pub claim_prefix: String,
    /// Envelope convention claim signatures are checked against.
    pub signing_scheme: SigningScheme,
    /// Version byte used when rendering legacy addresses.
    pub legacy_version: u8,
    /// Handling of signatures with non-32-byte R or S.
    pub signature_policy: SignaturePolicy,
    pub reinsert_pot: String,
    pub dao_pot: String,
    /// Unix seconds; the dilution schedule is derived from it unless
    /// `dilution_timestamps` is set.
    pub deployment_timestamp: Timestamp,
    pub dilution_timestamps: Option<[Timestamp; 3]>,
    /// Snapshot entries below this many base units are skipped.
    #[serde(with = "crate::amount")]
    pub min_snapshot_value: Amount,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            claim_prefix: String::new(),
            signing_scheme: SigningScheme::Diamond,
            legacy_version: VERSION_DIAMOND,
            signature_policy: SignaturePolicy::Lenient,
            reinsert_pot: DEFAULT_REINSERT_POT.to_string(),
            dao_pot: DEFAULT_DAO_POT.to_string(),
            deployment_timestamp: 0,
            dilution_timestamps: None,
            min_snapshot_value: DEFAULT_MIN_SNAPSHOT_VALUE,
        }
    }
}

impl LedgerConfig {
    /// Load defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ReclaimError> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load), reading variables from `env` instead of the
    /// process environment when it is `Some`.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ReclaimError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let cfg: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ReclaimError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check beneficiaries and schedule.
    pub fn validate(&self) -> Result<(), ReclaimError> {
        self.beneficiaries()?;
        self.schedule()?;
        Ok(())
    }

    /// Parsed beneficiary pots; neither may be the zero address.
    pub fn beneficiaries(&self) -> Result<Beneficiaries, LedgerError> {
        Ok(Beneficiaries {
            reinsert_pot: parse_pot("reinsert pot", &self.reinsert_pot)?,
            dao_pot: parse_pot("DAO pot", &self.dao_pot)?,
        })
    }

    pub fn schedule(&self) -> Result<DilutionSchedule, DilutionError> {
        match self.dilution_timestamps {
            Some(ts) => DilutionSchedule::try_from(ts),
            None => DilutionSchedule::from_deployment(self.deployment_timestamp),
        }
    }
}

fn parse_pot(label: &str, value: &str) -> Result<EthAddress, LedgerError> {
    let addr = EthAddress::parse(value)
        .map_err(|e| LedgerError::InvalidBeneficiary(format!("{label}: {e}")))?;
    if addr.is_zero() {
        return Err(LedgerError::InvalidBeneficiary(format!(
            "{label} must not be the zero address"
        )));
    }
    Ok(addr)
}

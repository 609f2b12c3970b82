//! Serde helpers for base-unit amounts.
//!
//! Amounts are written as decimal strings because JSON numbers cannot carry
//! `u128` safely. Plain integers are still accepted on input, which is what
//! TOML files and parsed environment variables produce.

use serde::{Deserialize, Deserializer, Serializer};

use reclaim_core::types::Amount;

#[derive(Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Text(String),
    Int(u64),
}

pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&amount.to_string())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
    match AmountRepr::deserialize(deserializer)? {
        AmountRepr::Int(v) => Ok(v as Amount),
        AmountRepr::Text(s) => parse_amount(&s).map_err(serde::de::Error::custom),
    }
}

/// Parse a decimal base-unit amount. Empty strings are zero.
pub fn parse_amount(s: &str) -> Result<Amount, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .parse::<Amount>()
        .map_err(|e| format!("invalid amount {trimmed:?}: {e}"))
}

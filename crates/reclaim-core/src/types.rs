//! Core protocol types.
//!
//! All monetary values are in base units (1 coin = 10^18 units) and use
//! `u128` so that whole-ledger totals never need a wider integer.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::codec::hex_to_bytes;
use crate::constants::{
    RETAINED_ACTIVE_BPS, RETAINED_STAGE1_BPS, RETAINED_STAGE2_BPS, RETAINED_STAGE3_BPS,
};
use crate::error::CodecError;
use crate::eth::EthAddress;

/// Value in base units.
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// A 20-byte RIPEMD-160(SHA-256(x)) digest.
///
/// This is the payload of a legacy address and the key of every ledger row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash160(pub [u8; 20]);

impl Hash160 {
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse from a slice, which must be exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 20] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl fmt::Display for Hash160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Hash160 {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex_to_bytes(s)?;
        Self::from_slice(&bytes).ok_or_else(|| CodecError::MalformedHex(format!("{s}: expected 20 bytes")))
    }
}

impl From<[u8; 20]> for Hash160 {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash160 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Hash160 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash160 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Global dilution state. Moves forward one step at a time and never back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DilutionStage {
    #[default]
    Active,
    Stage1,
    Stage2,
    /// Terminal.
    Stage3,
}

impl DilutionStage {
    pub const ALL: [DilutionStage; 4] = [
        DilutionStage::Active,
        DilutionStage::Stage1,
        DilutionStage::Stage2,
        DilutionStage::Stage3,
    ];

    /// 0 for `Active`, otherwise the stage number.
    pub fn index(&self) -> u8 {
        match self {
            DilutionStage::Active => 0,
            DilutionStage::Stage1 => 1,
            DilutionStage::Stage2 => 2,
            DilutionStage::Stage3 => 3,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn next(&self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn previous(&self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    pub fn is_terminal(&self) -> bool {
        *self == DilutionStage::Stage3
    }

    /// Fraction of an unclaimed balance still payable once this stage has
    /// fired, in basis points.
    pub fn retained_bps(&self) -> u128 {
        match self {
            DilutionStage::Active => RETAINED_ACTIVE_BPS,
            DilutionStage::Stage1 => RETAINED_STAGE1_BPS,
            DilutionStage::Stage2 => RETAINED_STAGE2_BPS,
            DilutionStage::Stage3 => RETAINED_STAGE3_BPS,
        }
    }
}

impl fmt::Display for DilutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DilutionStage::Active => write!(f, "active"),
            other => write!(f, "stage{}", other.index()),
        }
    }
}

/// How a forfeited amount is divided between the two beneficiary pots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PotSplit {
    pub reinsert: Amount,
    pub dao: Amount,
}

impl PotSplit {
    pub fn total(&self) -> Amount {
        self.reinsert + self.dao
    }
}

/// The two fixed accounts that receive diluted value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beneficiaries {
    pub reinsert_pot: EthAddress,
    pub dao_pot: EthAddress,
}

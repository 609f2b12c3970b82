//! Legacy Base58Check address encoding.
//!
//! A legacy address is `Base58(version || payload || checksum)` where
//! `checksum` is the first four bytes of `SHA256(SHA256(version || payload))`.
//! For pay-to-pubkey-hash addresses the payload is the 20-byte HASH160 of
//! the compressed public key.
//!
//! Known version bytes:
//! - `0x00` Bitcoin (`1...`)
//! - `0x5a` Diamond (`d...`)
//! - `0x0d` Diamond, alternate deployment

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::{VERSION_BITCOIN, VERSION_DIAMOND, VERSION_DIAMOND_ALT};
use crate::error::AddressError;
use crate::hash::sha256d;
use crate::types::Hash160;

const CHECKSUM_LEN: usize = 4;

/// Legacy network identified by its address version byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyNetwork {
    Bitcoin,
    Diamond,
    DiamondAlt,
}

impl LegacyNetwork {
    pub fn version_byte(&self) -> u8 {
        match self {
            LegacyNetwork::Bitcoin => VERSION_BITCOIN,
            LegacyNetwork::Diamond => VERSION_DIAMOND,
            LegacyNetwork::DiamondAlt => VERSION_DIAMOND_ALT,
        }
    }

    pub fn from_version(version: u8) -> Result<Self, AddressError> {
        match version {
            VERSION_BITCOIN => Ok(LegacyNetwork::Bitcoin),
            VERSION_DIAMOND => Ok(LegacyNetwork::Diamond),
            VERSION_DIAMOND_ALT => Ok(LegacyNetwork::DiamondAlt),
            other => Err(AddressError::UnknownVersion(other)),
        }
    }
}

/// Decode a Base58Check string into `(version, payload)`.
///
/// The checksum is verified and dropped.
pub fn decode_base58check(s: &str) -> Result<(u8, Vec<u8>), AddressError> {
    let raw = bs58::decode(s)
        .into_vec()
        .map_err(|e| AddressError::InvalidEncoding(e.to_string()))?;

    // version + at least one checksum byte set
    if raw.len() < 1 + CHECKSUM_LEN {
        return Err(AddressError::InvalidLength(raw.len()));
    }

    let (body, checksum) = raw.split_at(raw.len() - CHECKSUM_LEN);
    if sha256d(body)[..CHECKSUM_LEN] != *checksum {
        return Err(AddressError::ChecksumMismatch);
    }

    Ok((body[0], body[1..].to_vec()))
}

/// Encode `version || payload` with a Base58Check checksum.
pub fn encode_base58check(version: u8, payload: &[u8]) -> String {
    let mut buf = Vec::with_capacity(1 + payload.len() + CHECKSUM_LEN);
    buf.push(version);
    buf.extend_from_slice(payload);
    let checksum = sha256d(&buf);
    buf.extend_from_slice(&checksum[..CHECKSUM_LEN]);
    bs58::encode(buf).into_string()
}

/// A pay-to-pubkey-hash legacy address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LegacyAddress {
    version: u8,
    hash: Hash160,
}

impl LegacyAddress {
    /// Create an address for `hash` under an arbitrary version byte.
    pub fn from_hash160(hash: Hash160, version: u8) -> Self {
        Self { version, hash }
    }

    /// The Diamond (`0x5a`) address for `hash`.
    pub fn diamond(hash: Hash160) -> Self {
        Self::from_hash160(hash, VERSION_DIAMOND)
    }

    /// The Bitcoin (`0x00`) address for `hash`.
    pub fn bitcoin(hash: Hash160) -> Self {
        Self::from_hash160(hash, VERSION_BITCOIN)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// The 20-byte payload, used as the ledger key.
    pub fn hash160(&self) -> Hash160 {
        self.hash
    }

    /// Same payload under a different version byte.
    pub fn with_version(&self, version: u8) -> Self {
        Self::from_hash160(self.hash, version)
    }

    pub fn encode(&self) -> String {
        encode_base58check(self.version, self.hash.as_bytes())
    }

    /// Decode a legacy address. Any version byte is accepted; the payload
    /// must be exactly 20 bytes.
    pub fn decode(s: &str) -> Result<Self, AddressError> {
        let (version, payload) = decode_base58check(s)?;
        let hash = Hash160::from_slice(&payload).ok_or(AddressError::InvalidLength(payload.len()))?;
        Ok(Self { version, hash })
    }
}

/// Diamond address string for a HASH160.
pub fn legacy_address_from_hash160(hash: &Hash160) -> String {
    LegacyAddress::diamond(*hash).encode()
}

/// Bitcoin address string for a HASH160.
pub fn bitcoin_address_from_hash160(hash: &Hash160) -> String {
    LegacyAddress::bitcoin(*hash).encode()
}

impl fmt::Display for LegacyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl FromStr for LegacyAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for LegacyAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for LegacyAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::decode(&s).map_err(serde::de::Error::custom)
    }
}

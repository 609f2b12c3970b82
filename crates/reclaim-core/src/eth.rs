//! Ethereum-style 20-byte addresses with mixed-case checksums.
//!
//! The checksum hashes the lowercase hex digits (no `0x`) with Keccak-256 and
//! uppercases every letter whose corresponding hash nibble is 8 or more.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::AddressError;
use crate::hash::keccak256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EthAddress(pub [u8; 20]);

impl EthAddress {
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Parse a 40-digit hex address, with or without `0x`. Case is not
    /// validated against the checksum.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        if digits.len() != 40 {
            return Err(AddressError::InvalidEthAddress(s.to_string()));
        }
        let mut out = [0u8; 20];
        hex::decode_to_slice(digits, &mut out)
            .map_err(|_| AddressError::InvalidEthAddress(s.to_string()))?;
        Ok(Self(out))
    }

    /// `0x`-prefixed checksummed form.
    pub fn to_checksum(&self) -> String {
        checksum_hex(&hex::encode(self.0))
    }
}

/// Apply the mixed-case checksum to 40 lowercase hex digits. Returns `0x`-prefixed.
fn checksum_hex(lower: &str) -> String {
    let hash = keccak256(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Checksum an address given in any case.
pub fn address_checksum(address: &str) -> Result<String, AddressError> {
    Ok(EthAddress::parse(address)?.to_checksum())
}

impl fmt::Display for EthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}

impl FromStr for EthAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for EthAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for EthAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_vector() {
        assert_eq!(
            address_checksum("0xfec7b00dc0192319dda0c777a9f04e47dc49bd18").unwrap(),
            "0xfEc7B00DC0192319DdA0c777A9F04E47Dc49bD18"
        );
    }

    #[test]
    fn checksum_is_case_insensitive_on_input() {
        let upper = "0xFEC7B00DC0192319DDA0C777A9F04E47DC49BD18";
        assert_eq!(
            address_checksum(upper).unwrap(),
            "0xfEc7B00DC0192319DdA0c777A9F04E47Dc49bD18"
        );
    }

    #[test]
    fn checksum_idempotent() {
        let once = address_checksum("0x70a830c7efff19c9dd81db87107f5ea5804cbb3f").unwrap();
        assert_eq!(once, "0x70A830C7EffF19c9Dd81Db87107f5Ea5804cbb3F");
        assert_eq!(address_checksum(&once).unwrap(), once);
    }

    #[test]
    fn parse_without_prefix() {
        let a = EthAddress::parse("fec7b00dc0192319dda0c777a9f04e47dc49bd18").unwrap();
        assert_eq!(a.0[0], 0xfe);
    }

    #[test]
    fn parse_rejects_bad_length_and_digits() {
        assert!(EthAddress::parse("0x1234").is_err());
        assert!(EthAddress::parse("0xzec7b00dc0192319dda0c777a9f04e47dc49bd18").is_err());
    }

    #[test]
    fn zero_address() {
        let z: EthAddress = "0x0000000000000000000000000000000000000000".parse().unwrap();
        assert!(z.is_zero());
        assert_eq!(z, EthAddress::ZERO);
    }

    #[test]
    fn serde_uses_checksum() {
        let a = EthAddress::parse("0xfec7b00dc0192319dda0c777a9f04e47dc49bd18").unwrap();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"0xfEc7B00DC0192319DdA0c777A9F04E47Dc49bD18\"");
        let back: EthAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(a, back);
    }
}

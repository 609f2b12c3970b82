//! Address derivation from secp256k1 public keys.
//!
//! A recovered key can be rendered two ways:
//! - legacy: `Base58Check(version || HASH160(compressed_key))`
//! - ethereum: last 20 bytes of `Keccak256(x || y)`, checksum-cased

use std::fmt;

use crate::address::LegacyAddress;
use crate::codec::{bytes_to_hex, hex_to_bytes, zero_pad_32};
use crate::error::RecoveryError;
use crate::eth::EthAddress;
use crate::hash::{hash160, keccak256};
use crate::types::Hash160;

/// Affine coordinates of a point on secp256k1, big-endian.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKeyPoint {
    pub x: [u8; 32],
    pub y: [u8; 32],
}

impl PublicKeyPoint {
    /// Parse a SEC1 encoded key (33-byte compressed or 65-byte uncompressed).
    /// The point must lie on the curve.
    pub fn from_sec1(bytes: &[u8]) -> Result<Self, RecoveryError> {
        let key =
            k256::PublicKey::from_sec1_bytes(bytes).map_err(|_| RecoveryError::InvalidPublicKey)?;
        Ok(Self::from_public_key(&key))
    }

    pub fn from_public_key(key: &k256::PublicKey) -> Self {
        use k256::elliptic_curve::sec1::ToEncodedPoint;

        let point = key.to_encoded_point(false);
        // Uncompressed SEC1: 0x04 || x || y
        let bytes = point.as_bytes();
        let mut x = [0u8; 32];
        let mut y = [0u8; 32];
        x.copy_from_slice(&bytes[1..33]);
        y.copy_from_slice(&bytes[33..65]);
        Self { x, y }
    }

    /// Build from hex coordinates (with or without `0x`, any width up to 32
    /// bytes). The point must lie on the curve.
    pub fn from_hex(x: &str, y: &str) -> Result<Self, RecoveryError> {
        let pad = |s: &str| {
            hex_to_bytes(s)
                .and_then(|b| zero_pad_32(&b))
                .map_err(|_| RecoveryError::InvalidPublicKey)
        };
        let mut sec1 = Vec::with_capacity(65);
        sec1.push(0x04);
        sec1.extend_from_slice(&pad(x)?);
        sec1.extend_from_slice(&pad(y)?);
        Self::from_sec1(&sec1)
    }

    /// 33-byte compressed form: `0x02` for even y, `0x03` for odd y.
    pub fn compress(&self) -> [u8; 33] {
        let mut out = [0u8; 33];
        out[0] = 0x02 | (self.y[31] & 1);
        out[1..].copy_from_slice(&self.x);
        out
    }

    /// 65-byte uncompressed form: `0x04 || x || y`.
    pub fn uncompressed(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[0] = 0x04;
        out[1..33].copy_from_slice(&self.x);
        out[33..].copy_from_slice(&self.y);
        out
    }

    /// HASH160 of the compressed key, the payload of its legacy address.
    pub fn hash160(&self) -> Hash160 {
        hash160(&self.compress())
    }

    /// `0x`-prefixed, lower-case, 64-digit x coordinate.
    pub fn x_hex(&self) -> String {
        bytes_to_hex(&self.x, true)
    }

    /// `0x`-prefixed, lower-case, 64-digit y coordinate.
    pub fn y_hex(&self) -> String {
        bytes_to_hex(&self.y, true)
    }

    pub fn to_legacy_address(&self, version: u8) -> LegacyAddress {
        LegacyAddress::from_hash160(self.hash160(), version)
    }

    pub fn to_eth_address(&self) -> EthAddress {
        let mut xy = [0u8; 64];
        xy[..32].copy_from_slice(&self.x);
        xy[32..].copy_from_slice(&self.y);
        let digest = keccak256(&xy);
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest[12..]);
        EthAddress(out)
    }
}

impl fmt::Debug for PublicKeyPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKeyPoint({})", hex::encode(self.compress()))
    }
}

/// Legacy address string of the key at `(x, y)` under `version`.
pub fn public_key_to_legacy_address(x: &str, y: &str, version: u8) -> Result<String, RecoveryError> {
    Ok(PublicKeyPoint::from_hex(x, y)?.to_legacy_address(version).encode())
}

/// Checksummed Ethereum address of the key at `(x, y)`.
pub fn public_key_to_eth_address(x: &str, y: &str) -> Result<String, RecoveryError> {
    Ok(PublicKeyPoint::from_hex(x, y)?.to_eth_address().to_checksum())
}

/// Legacy address of a SEC1 public key given as hex.
pub fn sec1_hex_to_legacy_address(public_key: &str, version: u8) -> Result<LegacyAddress, RecoveryError> {
    let bytes = hex_to_bytes(public_key).map_err(|_| RecoveryError::InvalidPublicKey)?;
    Ok(PublicKeyPoint::from_sec1(&bytes)?.to_legacy_address(version))
}

/// Whether `address` is the legacy rendering of `point`, comparing payloads
/// only so that any version byte matches.
pub fn matches_legacy(point: &PublicKeyPoint, address: &LegacyAddress) -> bool {
    point.hash160() == address.hash160()
}

//! Public key recovery from legacy signed messages.
//!
//! Recovery is ECDSA public key recovery over the envelope digest from
//! [`crate::message::magic_hash`]. Signatures in the wild are not always
//! low-S; they are normalized here (flipping the y-parity bit of the
//! recovery id) because k256 only accepts low-S signatures.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use tracing::debug;

use crate::derivation::PublicKeyPoint;
use crate::error::RecoveryError;
use crate::eth::EthAddress;
use crate::message::{SigningScheme, magic_hash};
use crate::signature::{KeyFormat, parse_fixed65_base64};

/// A public key recovered from a signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoveredKey {
    /// SEC1 encoding in the format the signature header asked for.
    pub public_key: Vec<u8>,
    pub point: PublicKeyPoint,
}

impl RecoveredKey {
    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.public_key))
    }

    pub fn x(&self) -> String {
        self.point.x_hex()
    }

    pub fn y(&self) -> String {
        self.point.y_hex()
    }
}

/// Recover the signer's point from a 64-byte `r || s` and a recovery id in `0..=3`.
pub fn recover_point(
    compact: &[u8; 64],
    recovery_id: u8,
    prehash: &[u8; 32],
) -> Result<PublicKeyPoint, RecoveryError> {
    if recovery_id > 3 {
        return Err(RecoveryError::RecoveryFailed(format!(
            "recovery id {recovery_id} out of range"
        )));
    }

    let signature = Signature::from_slice(compact)
        .map_err(|e| RecoveryError::RecoveryFailed(e.to_string()))?;

    let (signature, recovery_id) = match signature.normalize_s() {
        Some(low) => (low, recovery_id ^ 1),
        None => (signature, recovery_id),
    };
    let rid = RecoveryId::from_byte(recovery_id)
        .ok_or_else(|| RecoveryError::RecoveryFailed(format!("recovery id {recovery_id}")))?;

    let key = VerifyingKey::recover_from_prehash(prehash, &signature, rid)
        .map_err(|e| RecoveryError::RecoveryFailed(e.to_string()))?;

    Ok(PublicKeyPoint::from_public_key(&k256::PublicKey::from(&key)))
}

/// SEC1 bytes of the recovered key, compressed (33 bytes) or not (65 bytes).
pub fn ec_recover(
    compact: &[u8; 64],
    recovery_id: u8,
    prehash: &[u8; 32],
    format: KeyFormat,
) -> Result<Vec<u8>, RecoveryError> {
    let point = recover_point(compact, recovery_id, prehash)?;
    Ok(match format {
        KeyFormat::Compressed => point.compress().to_vec(),
        KeyFormat::Uncompressed => point.uncompressed().to_vec(),
    })
}

/// Recover the key that signed `message` under `scheme`, using the recovery
/// id and key format from the signature header.
pub fn recover_public_key(
    signature: &str,
    message: &str,
    scheme: SigningScheme,
) -> Result<RecoveredKey, RecoveryError> {
    let parsed = parse_fixed65_base64(signature)?;
    let hash = magic_hash(message, scheme);
    debug!(
        recovery_id = parsed.recovery_id,
        compressed = parsed.is_compressed(),
        %scheme,
        "recovering public key"
    );

    let point = recover_point(&parsed.compact, parsed.recovery_id, &hash)?;
    let public_key = match parsed.key_format {
        KeyFormat::Compressed => point.compress().to_vec(),
        KeyFormat::Uncompressed => point.uncompressed().to_vec(),
    };
    Ok(RecoveredKey { public_key, point })
}

/// Ethereum address of whoever signed `message`.
pub fn eth_address_from_signature(
    signature: &str,
    message: &str,
    scheme: SigningScheme,
) -> Result<EthAddress, RecoveryError> {
    Ok(recover_public_key(signature, message, scheme)?.point.to_eth_address())
}

/// Sign `message` with a raw secp256k1 secret, producing the base64 form a
/// legacy wallet emits for a compressed key (header `31..=34`).
pub fn sign_message(
    secret: &[u8; 32],
    message: &str,
    scheme: SigningScheme,
) -> Result<String, RecoveryError> {
    let key = SigningKey::from_slice(secret).map_err(|_| RecoveryError::InvalidSecretKey)?;
    let hash = magic_hash(message, scheme);
    let (signature, rid) = key
        .sign_prehash_recoverable(&hash)
        .map_err(|e| RecoveryError::RecoveryFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(65);
    out.push(27 + 4 + rid.to_byte());
    out.extend_from_slice(&signature.to_bytes());
    Ok(STANDARD.encode(out))
}

/// Point of the public key belonging to `secret`.
pub fn public_key_of(secret: &[u8; 32]) -> Result<PublicKeyPoint, RecoveryError> {
    let key = SigningKey::from_slice(secret).map_err(|_| RecoveryError::InvalidSecretKey)?;
    Ok(PublicKeyPoint::from_public_key(&k256::PublicKey::from(key.verifying_key())))
}

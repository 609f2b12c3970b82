//! Signed-message envelopes.
//!
//! Legacy wallets do not sign the raw message. They sign
//! `sha256d(prefix || varint(len(message)) || message)`, where the prefix is a
//! fixed literal whose first byte (`0x18`) is its own length.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::hash::sha256d;

const DIAMOND_PREFIX: &str = "\x18Diamond Signed Message:\n";
const BITCOIN_PREFIX: &str = "\x18Bitcoin Signed Message:\n";

/// Which legacy "Signed Message" convention produced a signature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningScheme {
    /// Diamond wallets (scheme A).
    #[default]
    Diamond,
    /// Bitcoin Core compatible wallets (scheme B).
    Bitcoin,
}

impl SigningScheme {
    pub fn prefix(&self) -> &'static str {
        match self {
            SigningScheme::Diamond => DIAMOND_PREFIX,
            SigningScheme::Bitcoin => BITCOIN_PREFIX,
        }
    }
}

impl fmt::Display for SigningScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningScheme::Diamond => write!(f, "diamond"),
            SigningScheme::Bitcoin => write!(f, "bitcoin"),
        }
    }
}

impl FromStr for SigningScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "diamond" | "dmd" => Ok(SigningScheme::Diamond),
            "bitcoin" | "btc" => Ok(SigningScheme::Bitcoin),
            other => Err(format!("unknown signing scheme: {other}")),
        }
    }
}

/// Append the Bitcoin-style variable-length integer encoding of `n`.
pub fn write_varint(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xFC => buf.push(n as u8),
        0xFD..=0xFFFF => {
            buf.push(0xFD);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xFFFF_FFFF => {
            buf.push(0xFE);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xFF);
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}

/// Build the exact byte sequence that is hashed for signing.
///
/// The length is the UTF-8 byte length of `message`, not its char count.
pub fn build_envelope(prefix: &str, message: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(prefix.len() + 9 + message.len());
    buf.extend_from_slice(prefix.as_bytes());
    write_varint(&mut buf, message.len() as u64);
    buf.extend_from_slice(message.as_bytes());
    buf
}

/// The digest a legacy wallet signs for `message` under `scheme`.
pub fn magic_hash(message: &str, scheme: SigningScheme) -> [u8; 32] {
    sha256d(&build_envelope(scheme.prefix(), message))
}

/// Compose a claim message: `prefix || checksummed_target || postfix`.
pub fn claim_message(prefix: &str, checksummed_target: &str, postfix: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + checksummed_target.len() + postfix.len());
    out.push_str(prefix);
    out.push_str(checksummed_target);
    out.push_str(postfix);
    out
}

//! Compact recoverable signature parsing.
//!
//! Legacy wallets emit a 65-byte signature, base64 encoded:
//!
//! ```text
//! [ header | r (32) | s (32) ]
//! ```
//!
//! The header is `27 + flag`, where the flag nibble packs the recovery id
//! (bits 0-1), key compression (bits 2-3 non-zero) and an optional segwit
//! address type (bit 3 set, bit 2 selects P2WPKH over P2SH-P2WPKH).
//!
//! Claims read the same bytes a second way: the first byte is taken as the
//! byte length of R and S fills the rest up to offset 65. For well-formed
//! input with a header of 32 both readings agree. Anything else is returned
//! as [`SignatureParts::Suspect`] so the caller decides how strict to be.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{RECOVERABLE_SIGNATURE_LEN, SIGNATURE_COMPONENT_LEN};
use crate::error::SignatureError;

/// Header byte offset: `header = 27 + flag`.
const HEADER_BASE: u8 = 27;

/// Segwit address type carried in the header. Informational only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SegwitType {
    None,
    P2shP2wpkh,
    P2wpkh,
}

/// Encoding of the public key the signature commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyFormat {
    Compressed,
    Uncompressed,
}

/// A decoded 65-byte recoverable signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureComponents {
    pub recovery_id: u8,
    pub key_format: KeyFormat,
    pub segwit: SegwitType,
    /// `r || s`, i.e. bytes `1..65` of the encoded signature.
    pub compact: [u8; 64],
}

impl SignatureComponents {
    pub fn is_compressed(&self) -> bool {
        self.key_format == KeyFormat::Compressed
    }
}

/// Decode standard base64 into raw bytes.
pub fn decode_base64(signature: &str) -> Result<Vec<u8>, SignatureError> {
    STANDARD
        .decode(signature.trim())
        .map_err(|e| SignatureError::InvalidEncoding(e.to_string()))
}

/// Parse a fixed 65-byte signature using its header flag.
pub fn parse_fixed65(bytes: &[u8]) -> Result<SignatureComponents, SignatureError> {
    if bytes.len() != RECOVERABLE_SIGNATURE_LEN {
        return Err(SignatureError::InvalidSignatureLength(bytes.len()));
    }

    let header = bytes[0];
    let flag = header
        .checked_sub(HEADER_BASE)
        .filter(|f| *f <= 15)
        .ok_or(SignatureError::InvalidRecoveryFlag(header))?;

    let key_format = if flag & 12 != 0 {
        KeyFormat::Compressed
    } else {
        KeyFormat::Uncompressed
    };
    let segwit = if flag & 8 == 0 {
        SegwitType::None
    } else if flag & 4 == 0 {
        SegwitType::P2shP2wpkh
    } else {
        SegwitType::P2wpkh
    };

    let mut compact = [0u8; 64];
    compact.copy_from_slice(&bytes[1..]);

    Ok(SignatureComponents {
        recovery_id: flag & 3,
        key_format,
        segwit,
        compact,
    })
}

/// Base64 convenience wrapper around [`parse_fixed65`].
pub fn parse_fixed65_base64(signature: &str) -> Result<SignatureComponents, SignatureError> {
    parse_fixed65(&decode_base64(signature)?)
}

/// How to treat signatures whose R or S is not exactly 32 bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignaturePolicy {
    /// Reject suspect signatures outright.
    Strict,
    /// Accept a suspect signature when R and S together still span 64 bytes.
    #[default]
    Lenient,
}

/// Result of the length-prefixed reading of a signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignatureParts {
    /// R and S are both 32 bytes.
    Parsed { r: Vec<u8>, s: Vec<u8> },
    /// R or S has an unexpected length.
    Suspect { r: Vec<u8>, s: Vec<u8>, reason: String },
}

impl SignatureParts {
    pub fn r(&self) -> &[u8] {
        match self {
            SignatureParts::Parsed { r, .. } | SignatureParts::Suspect { r, .. } => r,
        }
    }

    pub fn s(&self) -> &[u8] {
        match self {
            SignatureParts::Parsed { s, .. } | SignatureParts::Suspect { s, .. } => s,
        }
    }

    pub fn is_suspect(&self) -> bool {
        matches!(self, SignatureParts::Suspect { .. })
    }

    /// The 64-byte `r || s` handed to EC recovery.
    ///
    /// Under [`SignaturePolicy::Strict`] a suspect signature is rejected.
    /// Under [`SignaturePolicy::Lenient`] it is accepted only if the two
    /// parts still concatenate to exactly 64 bytes.
    pub fn compact(&self, policy: SignaturePolicy) -> Result<[u8; 64], SignatureError> {
        let (r, s) = (self.r(), self.s());
        let non_canonical = SignatureError::NonCanonicalComponents {
            r_len: r.len(),
            s_len: s.len(),
        };

        if self.is_suspect() && policy == SignaturePolicy::Strict {
            return Err(non_canonical);
        }
        if r.len() + s.len() != 2 * SIGNATURE_COMPONENT_LEN {
            return Err(non_canonical);
        }

        let mut out = [0u8; 64];
        out[..r.len()].copy_from_slice(r);
        out[r.len()..].copy_from_slice(s);
        Ok(out)
    }
}

/// Split a base64 signature using its first byte as the length of R.
///
/// `r = bytes[1 .. 1 + bytes[0]]` and `s = bytes[1 + bytes[0] .. 65]`, both
/// clamped to the input. Fails only when the declared R length exceeds the
/// input length.
pub fn parse_variable(signature: &str) -> Result<SignatureParts, SignatureError> {
    let bytes = decode_base64(signature)?;
    split_variable(&bytes)
}

/// Byte-level form of [`parse_variable`].
pub fn split_variable(bytes: &[u8]) -> Result<SignatureParts, SignatureError> {
    let Some(&first) = bytes.first() else {
        return Err(SignatureError::InvalidSignatureLength(0));
    };

    let r_len = first as usize;
    if r_len > bytes.len() {
        return Err(SignatureError::RComponentTooLarge {
            r_len,
            len: bytes.len(),
        });
    }

    let s_start = (1 + r_len).min(bytes.len());
    let s_end = RECOVERABLE_SIGNATURE_LEN.min(bytes.len()).max(s_start);
    let r = bytes[1..s_start].to_vec();
    let s = bytes[s_start..s_end].to_vec();

    if r.len() == SIGNATURE_COMPONENT_LEN && s.len() == SIGNATURE_COMPONENT_LEN {
        return Ok(SignatureParts::Parsed { r, s });
    }

    let reason = format!(
        "expected 32-byte R and S, got r={} s={} (input {} bytes)",
        r.len(),
        s.len(),
        bytes.len()
    );
    warn!(r_len = r.len(), s_len = s.len(), total = bytes.len(), "suspect signature component lengths");
    Ok(SignatureParts::Suspect { r, s, reason })
}

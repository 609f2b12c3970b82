//! Hex and byte helpers shared by the address and signature codecs.
//!
//! Hex input is accepted with or without a `0x` prefix. An odd number of
//! digits is treated as if a leading zero nibble were present, so `"0xabc"`
//! decodes to `[0x0a, 0xbc]`.

use crate::error::CodecError;

/// Strip an optional `0x` prefix and left-pad to an even digit count.
fn normalize_hex(input: &str) -> String {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    if digits.len() % 2 != 0 {
        format!("0{digits}")
    } else {
        digits.to_string()
    }
}

/// Decode a hex string into bytes.
pub fn hex_to_bytes(input: &str) -> Result<Vec<u8>, CodecError> {
    hex::decode(normalize_hex(input)).map_err(|e| CodecError::MalformedHex(format!("{input:?}: {e}")))
}

/// Encode bytes as lower-case hex, optionally with a `0x` prefix.
pub fn bytes_to_hex(bytes: &[u8], prefixed: bool) -> String {
    if prefixed {
        format!("0x{}", hex::encode(bytes))
    } else {
        hex::encode(bytes)
    }
}

/// Left-pad `bytes` with zeros to exactly 32 bytes.
pub fn zero_pad_32(bytes: &[u8]) -> Result<[u8; 32], CodecError> {
    if bytes.len() > 32 {
        return Err(CodecError::ValueTooLarge {
            len: bytes.len(),
            max: 32,
        });
    }
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(bytes);
    Ok(out)
}

/// Prepend the bytes of `prefix_hex` to `payload`.
pub fn prefix_bytes(payload: &[u8], prefix_hex: &str) -> Result<Vec<u8>, CodecError> {
    let mut out = hex_to_bytes(prefix_hex)?;
    out.extend_from_slice(payload);
    Ok(out)
}

/// Hex of the UTF-8 bytes of `text`, `0x`-prefixed.
pub fn utf8_to_hex(text: &str) -> String {
    bytes_to_hex(text.as_bytes(), true)
}

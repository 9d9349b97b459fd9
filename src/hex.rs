//! 0x-prefixed hex helpers shared by the RLP, ABI, and RPC layers.
//!
//! This module owns the one seam where "arbitrary precision integer" meets
//! "byte string": every other module converts through [`to_bytes`] /
//! [`from_bytes`] rather than rolling its own hex parsing.

use alloy_primitives::U256;

use crate::error::{Error, ErrorKind};

/// Strips a leading `0x`/`0X` prefix, if present.
pub fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s)
}

/// Prefixes `s` with `0x` unless it already has one.
pub fn with_0x(s: &str) -> String {
    if s.starts_with("0x") || s.starts_with("0X") {
        s.to_string()
    } else {
        format!("0x{s}")
    }
}

/// Validates that `s` is `0x` followed by an even or odd run of hex digits.
pub fn is_hex(s: &str) -> bool {
    let body = strip_0x(s);
    !body.is_empty() && body.chars().all(|c| c.is_ascii_hexdigit())
}

/// Decodes a 0x-prefixed (or bare) hex string into bytes.
///
/// An odd-length stripped string is left-padded with a `0` nibble, per the
/// byte-array conversion rule.
pub fn to_bytes(s: &str) -> Result<Vec<u8>, Error> {
    let body = strip_0x(s);
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let owned;
    let even = if body.len() % 2 == 1 {
        owned = format!("0{body}");
        owned.as_str()
    } else {
        body
    };
    ::hex::decode(even).map_err(|e| {
        Error::new(ErrorKind::InvalidArgument).with_message(format!("invalid hex string: {e}"))
    })
}

/// Encodes bytes as a lowercase 0x-prefixed hex string.
pub fn from_bytes(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", ::hex::encode(bytes.as_ref()))
}

/// Parses a 0x-prefixed hex string as an arbitrary-precision non-negative
/// integer, or a bare decimal string (the ABI boundary accepts both).
pub fn to_u256(s: &str) -> Result<U256, Error> {
    if is_hex(s) {
        let body = strip_0x(s);
        let body = if body.is_empty() { "0" } else { body };
        U256::from_str_radix(body, 16)
            .map_err(|e| Error::new(ErrorKind::InvalidArgument).with_message(e.to_string()))
    } else {
        U256::from_str_radix(s, 10)
            .map_err(|e| Error::new(ErrorKind::InvalidArgument).with_message(e.to_string()))
    }
}

/// Encodes `n` as the minimal hex quantity used by JSON-RPC (`0x0` for zero,
/// no leading zero nibble otherwise).
pub fn to_quantity(n: U256) -> String {
    if n.is_zero() {
        return "0x0".to_string();
    }
    let bytes = n.to_be_bytes_vec();
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    let mut s = ::hex::encode(&bytes[first_nonzero..]);
    // strip a single leading zero nibble to get the minimal digit count
    if s.starts_with('0') && s.len() > 1 {
        s.remove(0);
    }
    format!("0x{s}")
}

/// Parses a JSON-RPC quantity (or plain hex/decimal) back into a `U256`.
pub fn from_quantity(s: &str) -> Result<U256, Error> {
    to_u256(s)
}

/// Encodes `n` as the minimal big-endian byte string used by RLP field
/// framing: value zero encodes as the empty byte string, never `[0x00]`.
pub fn to_minimal_be_bytes(n: U256) -> Vec<u8> {
    if n.is_zero() {
        return Vec::new();
    }
    let bytes = n.to_be_bytes_vec();
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    bytes[first_nonzero..].to_vec()
}

/// Left-pads `data` with zero bytes to `len`.
pub fn pad_left(data: &[u8], len: usize) -> Vec<u8> {
    if data.len() >= len {
        return data[data.len() - len..].to_vec();
    }
    let mut out = vec![0u8; len - data.len()];
    out.extend_from_slice(data);
    out
}

/// Right-pads `data` with zero bytes to `len`.
pub fn pad_right(data: &[u8], len: usize) -> Vec<u8> {
    if data.len() >= len {
        return data[..len].to_vec();
    }
    let mut out = data.to_vec();
    out.resize(len, 0);
    out
}

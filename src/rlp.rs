//! Recursive Length Prefix encoder.
//!
//! This codec only encodes; nothing in this repository needs to decode RLP
//! (transactions are built and signed here, never parsed back out of their
//! wire form).

use alloy_primitives::{Address, Bytes, B256, U256};

use crate::hex::to_minimal_be_bytes;

/// Encodes a single RLP byte string per the four string-framing rules.
pub fn encode_bytes(s: &[u8]) -> Vec<u8> {
    if s.is_empty() {
        return vec![0x80];
    }
    if s.len() == 1 && s[0] < 0x80 {
        return vec![s[0]];
    }
    let mut out = Vec::with_capacity(s.len() + 9);
    if s.len() < 56 {
        out.push(0x80 + s.len() as u8);
    } else {
        let len_bytes = minimal_be(s.len() as u64);
        out.push(0xB7 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
    }
    out.extend_from_slice(s);
    out
}

/// Encodes an RLP list given the already-encoded bytes of each item.
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let inner_len: usize = items.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(inner_len + 9);
    if inner_len < 56 {
        out.push(0xC0 + inner_len as u8);
    } else {
        let len_bytes = minimal_be(inner_len as u64);
        out.push(0xF7 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
    }
    for item in items {
        out.extend_from_slice(item);
    }
    out
}

/// Minimal big-endian byte representation of a `u64` (used for length
/// prefixes, which are never the "quantity zero" case since lengths that
/// reach this path are always ≥56).
fn minimal_be(mut n: u64) -> Vec<u8> {
    if n == 0 {
        return vec![0];
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push((n & 0xff) as u8);
        n >>= 8;
    }
    out.reverse();
    out
}

/// Values that know how to RLP-encode themselves as a single item
/// (a byte string, not a list — lists are built from items via
/// [`encode_list`]).
pub trait Encodable {
    fn rlp_encode(&self) -> Vec<u8>;
}

impl Encodable for U256 {
    fn rlp_encode(&self) -> Vec<u8> {
        encode_bytes(&to_minimal_be_bytes(*self))
    }
}

impl Encodable for u64 {
    fn rlp_encode(&self) -> Vec<u8> {
        encode_bytes(&to_minimal_be_bytes(U256::from(*self)))
    }
}

impl Encodable for [u8] {
    fn rlp_encode(&self) -> Vec<u8> {
        encode_bytes(self)
    }
}

impl Encodable for Vec<u8> {
    fn rlp_encode(&self) -> Vec<u8> {
        encode_bytes(self)
    }
}

impl Encodable for Bytes {
    fn rlp_encode(&self) -> Vec<u8> {
        encode_bytes(self.as_ref())
    }
}

/// `to` encodes as 20 raw bytes, or the empty string for contract creation.
impl Encodable for Option<Address> {
    fn rlp_encode(&self) -> Vec<u8> {
        match self {
            Some(addr) => encode_bytes(addr.as_slice()),
            None => encode_bytes(&[]),
        }
    }
}

impl Encodable for Address {
    fn rlp_encode(&self) -> Vec<u8> {
        encode_bytes(self.as_slice())
    }
}

/// A storage key encodes as its full 32 raw bytes, unlike a `U256` quantity
/// (which strips leading zero bytes).
impl Encodable for B256 {
    fn rlp_encode(&self) -> Vec<u8> {
        encode_bytes(self.as_slice())
    }
}

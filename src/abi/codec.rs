//! Head/tail ABI encoding and decoding.
//!
//! `encode_tuple`/`decode_tuple` are the one pair of functions that embody
//! the whole algorithm: every array, fixed array, and nested tuple is
//! encoded/decoded by recursing into a *fresh* head/tail scope, so
//! dynamicness and offsets are computed bottom-up rather than guessed at.
//! This keeps nested tuples and arrays correct no matter how deep they
//! nest, since each scope's own statics/dynamics split is independent of
//! its parent's.

use alloy_primitives::{Address, I256, U256};
use serde_json::Value;

use super::types::{ParamType, Token};
use crate::error::AbiError;
use crate::hex;

const WORD: usize = 32;

/// Encodes a value tuple against a type tuple, using the Ethereum ABI's
/// head/tail layout for dynamic types.
pub fn encode(types: &[ParamType], tokens: &[Token]) -> Result<Vec<u8>, AbiError> {
    if types.len() != tokens.len() {
        return Err(AbiError::ArityMismatch { expected: types.len(), got: tokens.len() });
    }
    for (ty, tok) in types.iter().zip(tokens) {
        check_shape(ty, tok)?;
    }
    Ok(encode_tuple(types, tokens))
}

/// Checks that `tok` is shaped like `ty` before encoding (catches caller
/// mistakes early, as `INVALID_ARGUMENT` rather than a confusing panic).
fn check_shape(ty: &ParamType, tok: &Token) -> Result<(), AbiError> {
    let mismatch = || AbiError::InvalidValue { ty: ty.canonical(), reason: format!("{tok:?}") };
    match (ty, tok) {
        (ParamType::Uint(bits), Token::Uint(v)) => {
            if *bits < 256 && *v >= (U256::from(1u8) << *bits) {
                return Err(AbiError::InvalidValue {
                    ty: ty.canonical(),
                    reason: format!("value {v} does not fit in uint{bits}"),
                });
            }
            Ok(())
        }
        (ParamType::Int(_), Token::Int(_)) => Ok(()),
        (ParamType::Address, Token::Address(_)) => Ok(()),
        (ParamType::Bool, Token::Bool(_)) => Ok(()),
        (ParamType::Bytes, Token::Bytes(_)) => Ok(()),
        (ParamType::FixedBytes(n), Token::FixedBytes(b)) => {
            if b.len() != *n {
                return Err(AbiError::InvalidValue {
                    ty: ty.canonical(),
                    reason: format!("expected {n} bytes, got {}", b.len()),
                });
            }
            Ok(())
        }
        (ParamType::String, Token::String(_)) => Ok(()),
        (ParamType::Array(elem), Token::Array(items)) => {
            items.iter().try_for_each(|t| check_shape(elem, t))
        }
        (ParamType::FixedArray(elem, k), Token::FixedArray(items)) => {
            if items.len() != *k {
                return Err(AbiError::InvalidValue {
                    ty: ty.canonical(),
                    reason: format!("expected {k} elements, got {}", items.len()),
                });
            }
            items.iter().try_for_each(|t| check_shape(elem, t))
        }
        (ParamType::Tuple(components), Token::Tuple(items)) => {
            if items.len() != components.len() {
                return Err(AbiError::ArityMismatch { expected: components.len(), got: items.len() });
            }
            components.iter().zip(items).try_for_each(|(c, t)| check_shape(c, t))
        }
        _ => Err(mismatch()),
    }
}

enum HeadPart {
    Static(Vec<u8>),
    Dynamic(usize),
}

/// Encodes a tuple's head/tail region, recursing into a fresh scope for
/// every nested array/tuple.
fn encode_tuple(types: &[ParamType], tokens: &[Token]) -> Vec<u8> {
    let mut head_parts = Vec::with_capacity(types.len());
    let mut tails: Vec<Vec<u8>> = Vec::new();
    for (ty, tok) in types.iter().zip(tokens) {
        if ty.is_dynamic() {
            let payload = encode_token(ty, tok);
            tails.push(payload);
            head_parts.push(HeadPart::Dynamic(tails.len() - 1));
        } else {
            head_parts.push(HeadPart::Static(encode_token(ty, tok)));
        }
    }
    let head_size: usize = head_parts
        .iter()
        .map(|p| match p {
            HeadPart::Static(b) => b.len(),
            HeadPart::Dynamic(_) => WORD,
        })
        .sum();

    let mut tail_offsets = Vec::with_capacity(tails.len());
    let mut running = head_size;
    for t in &tails {
        tail_offsets.push(running);
        running += t.len();
    }

    let mut out = Vec::with_capacity(running);
    for part in &head_parts {
        match part {
            HeadPart::Static(b) => out.extend_from_slice(b),
            HeadPart::Dynamic(idx) => {
                out.extend_from_slice(&hex::pad_left(&u256_be(tail_offsets[*idx] as u64), WORD))
            }
        }
    }
    for t in tails {
        out.extend_from_slice(&t);
    }
    out
}

/// Encodes a single token: the inline static bytes if `ty` is static, or
/// the full dynamic payload (length-prefixed where applicable) otherwise.
fn encode_token(ty: &ParamType, tok: &Token) -> Vec<u8> {
    match (ty, tok) {
        (ParamType::Uint(_), Token::Uint(v)) => hex::pad_left(&v.to_be_bytes_vec(), WORD),
        (ParamType::Int(_), Token::Int(v)) => signed_to_32_bytes(*v),
        (ParamType::Address, Token::Address(a)) => hex::pad_left(a.as_slice(), WORD),
        (ParamType::Bool, Token::Bool(b)) => {
            hex::pad_left(&[if *b { 1 } else { 0 }], WORD)
        }
        (ParamType::FixedBytes(_), Token::FixedBytes(b)) => hex::pad_right(b, WORD),
        (ParamType::Bytes, Token::Bytes(b)) => encode_dynamic_bytes(b),
        (ParamType::String, Token::String(s)) => encode_dynamic_bytes(s.as_bytes()),
        (ParamType::Array(elem), Token::Array(items)) => {
            let len = items.len() as u64;
            let inner_types: Vec<ParamType> = (0..items.len()).map(|_| (**elem).clone()).collect();
            let mut out = hex::pad_left(&u256_be(len), WORD);
            out.extend_from_slice(&encode_tuple(&inner_types, items));
            out
        }
        (ParamType::FixedArray(elem, k), Token::FixedArray(items)) => {
            let inner_types: Vec<ParamType> = (0..*k).map(|_| (**elem).clone()).collect();
            encode_tuple(&inner_types, items)
        }
        (ParamType::Tuple(components), Token::Tuple(items)) => encode_tuple(components, items),
        _ => unreachable!("check_shape validates this pairing before encode_token is reached"),
    }
}

fn encode_dynamic_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = hex::pad_left(&u256_be(data.len() as u64), WORD);
    out.extend_from_slice(data);
    let padded_len = data.len().div_ceil(WORD) * WORD;
    out.resize(out.len() + (padded_len - data.len()), 0);
    out
}

fn u256_be(n: u64) -> Vec<u8> {
    n.to_be_bytes().to_vec()
}

fn signed_to_32_bytes(v: I256) -> Vec<u8> {
    let bytes = v.to_be_bytes::<32>();
    bytes.to_vec()
}

/// Encodes a single value the way it would be encoded if it were the sole
/// parameter of a non-indexed tuple: inline static bytes, or length-prefixed
/// payload for dynamic types. Used to compute indexed event topics for
/// reference types, which the EVM stores as the `keccak256` of this
/// standalone encoding rather than the value itself.
pub fn encode_single(ty: &ParamType, tok: &Token) -> Vec<u8> {
    encode_token(ty, tok)
}

/// Decodes a single value from exactly the bytes of one static word. Used
/// to decode indexed event topics of static (non-reference) types.
pub fn decode_single(ty: &ParamType, slice: &[u8]) -> Result<Token, AbiError> {
    decode_token(ty, slice)
}

/// Decodes a value tuple from `data` per the declared `types`.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    decode_tuple(types, data)
}

fn decode_tuple(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    let mut tokens = Vec::with_capacity(types.len());
    let mut head_pos = 0usize;
    for ty in types {
        if ty.is_dynamic() {
            let word = read_word(data, head_pos)?;
            let offset = word_to_usize(&word)?;
            if offset > data.len() {
                return Err(AbiError::MalformedData(format!(
                    "dynamic offset {offset} exceeds data length {}",
                    data.len()
                )));
            }
            let token = decode_token(ty, &data[offset..])?;
            tokens.push(token);
            head_pos += WORD;
        } else {
            let size = ty.static_size();
            if head_pos + size > data.len() {
                return Err(AbiError::MalformedData(format!(
                    "truncated static value for {}",
                    ty.canonical()
                )));
            }
            let token = decode_token(ty, &data[head_pos..head_pos + size])?;
            tokens.push(token);
            head_pos += size;
        }
    }
    Ok(tokens)
}

fn decode_token(ty: &ParamType, slice: &[u8]) -> Result<Token, AbiError> {
    match ty {
        ParamType::Uint(_) => {
            let word = read_word(slice, 0)?;
            Ok(Token::Uint(U256::from_be_bytes(word)))
        }
        ParamType::Int(_) => {
            let word = read_word(slice, 0)?;
            Ok(Token::Int(I256::from_be_bytes(word)))
        }
        ParamType::Address => {
            let word = read_word(slice, 0)?;
            Ok(Token::Address(Address::from_slice(&word[12..32])))
        }
        ParamType::Bool => {
            let word = read_word(slice, 0)?;
            Ok(Token::Bool(word[31] != 0))
        }
        ParamType::FixedBytes(n) => {
            let word = read_word(slice, 0)?;
            Ok(Token::FixedBytes(word[..*n].to_vec()))
        }
        ParamType::Bytes => {
            let (len, payload) = read_length_prefixed(slice)?;
            Ok(Token::Bytes(payload[..len].to_vec()))
        }
        ParamType::String => {
            let (len, payload) = read_length_prefixed(slice)?;
            let s = String::from_utf8(payload[..len].to_vec()).map_err(|_| AbiError::InvalidUtf8)?;
            Ok(Token::String(s))
        }
        ParamType::Array(elem) => {
            let word = read_word(slice, 0)?;
            let len = word_to_usize(&word)?;
            let inner_types: Vec<ParamType> = (0..len).map(|_| (**elem).clone()).collect();
            let rest = slice.get(WORD..).ok_or_else(|| {
                AbiError::MalformedData("truncated dynamic array".to_string())
            })?;
            let items = decode_tuple(&inner_types, rest)?;
            Ok(Token::Array(items))
        }
        ParamType::FixedArray(elem, k) => {
            let inner_types: Vec<ParamType> = (0..*k).map(|_| (**elem).clone()).collect();
            let items = decode_tuple(&inner_types, slice)?;
            Ok(Token::FixedArray(items))
        }
        ParamType::Tuple(components) => {
            let items = decode_tuple(components, slice)?;
            Ok(Token::Tuple(items))
        }
    }
}

fn read_word(data: &[u8], pos: usize) -> Result<[u8; 32], AbiError> {
    data.get(pos..pos + WORD)
        .map(|s| {
            let mut w = [0u8; 32];
            w.copy_from_slice(s);
            w
        })
        .ok_or_else(|| AbiError::MalformedData("truncated word".to_string()))
}

fn word_to_usize(word: &[u8; 32]) -> Result<usize, AbiError> {
    if word[..24].iter().any(|&b| b != 0) {
        return Err(AbiError::MalformedData("length/offset overflows usize".to_string()));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..32]);
    Ok(u64::from_be_bytes(buf) as usize)
}

fn read_length_prefixed(slice: &[u8]) -> Result<(usize, &[u8]), AbiError> {
    let word = read_word(slice, 0)?;
    let len = word_to_usize(&word)?;
    let payload = slice
        .get(WORD..)
        .ok_or_else(|| AbiError::MalformedData("truncated length-prefixed value".to_string()))?;
    if payload.len() < len {
        return Err(AbiError::MalformedData("length-prefixed value shorter than claimed".to_string()));
    }
    Ok((len, payload))
}

/// Converts a loosely-typed JSON value into a [`Token`] for the given type:
/// integers as decimal strings, hex strings, or native numbers; addresses
/// as strings; everything else structurally.
pub fn token_from_value(ty: &ParamType, value: &Value) -> Result<Token, AbiError> {
    match ty {
        ParamType::Uint(bits) => {
            let n = value_to_u256(value)?;
            if *bits < 256 && n >= (U256::from(1u8) << *bits) {
                return Err(AbiError::InvalidValue {
                    ty: ty.canonical(),
                    reason: format!("value {n} does not fit in uint{bits}"),
                });
            }
            Ok(Token::Uint(n))
        }
        ParamType::Int(_) => Ok(Token::Int(value_to_i256(value)?)),
        ParamType::Address => {
            let s = value
                .as_str()
                .ok_or_else(|| AbiError::InvalidValue { ty: ty.canonical(), reason: "expected string".into() })?;
            parse_address(s).map(Token::Address)
        }
        ParamType::Bool => value
            .as_bool()
            .map(Token::Bool)
            .ok_or_else(|| AbiError::InvalidValue { ty: ty.canonical(), reason: "expected bool".into() }),
        ParamType::Bytes => {
            let s = value
                .as_str()
                .ok_or_else(|| AbiError::InvalidValue { ty: ty.canonical(), reason: "expected 0x hex string".into() })?;
            Ok(Token::Bytes(hex::to_bytes(s).map_err(|_| AbiError::MalformedData(s.to_string()))?))
        }
        ParamType::FixedBytes(n) => {
            let s = value
                .as_str()
                .ok_or_else(|| AbiError::InvalidValue { ty: ty.canonical(), reason: "expected 0x hex string".into() })?;
            let bytes = hex::to_bytes(s).map_err(|_| AbiError::MalformedData(s.to_string()))?;
            if bytes.len() != *n {
                return Err(AbiError::InvalidValue {
                    ty: ty.canonical(),
                    reason: format!("expected {n} bytes, got {}", bytes.len()),
                });
            }
            Ok(Token::FixedBytes(bytes))
        }
        ParamType::String => value
            .as_str()
            .map(|s| Token::String(s.to_string()))
            .ok_or_else(|| AbiError::InvalidValue { ty: ty.canonical(), reason: "expected string".into() }),
        ParamType::Array(elem) => {
            let arr = value
                .as_array()
                .ok_or_else(|| AbiError::InvalidValue { ty: ty.canonical(), reason: "expected array".into() })?;
            let items = arr.iter().map(|v| token_from_value(elem, v)).collect::<Result<_, _>>()?;
            Ok(Token::Array(items))
        }
        ParamType::FixedArray(elem, k) => {
            let arr = value
                .as_array()
                .ok_or_else(|| AbiError::InvalidValue { ty: ty.canonical(), reason: "expected array".into() })?;
            if arr.len() != *k {
                return Err(AbiError::InvalidValue {
                    ty: ty.canonical(),
                    reason: format!("expected {k} elements, got {}", arr.len()),
                });
            }
            let items = arr.iter().map(|v| token_from_value(elem, v)).collect::<Result<_, _>>()?;
            Ok(Token::FixedArray(items))
        }
        ParamType::Tuple(components) => {
            let arr = value
                .as_array()
                .ok_or_else(|| AbiError::InvalidValue { ty: ty.canonical(), reason: "expected array".into() })?;
            if arr.len() != components.len() {
                return Err(AbiError::ArityMismatch { expected: components.len(), got: arr.len() });
            }
            let items = components
                .iter()
                .zip(arr)
                .map(|(c, v)| token_from_value(c, v))
                .collect::<Result<_, _>>()?;
            Ok(Token::Tuple(items))
        }
    }
}

/// Parses a 40-hex-digit address, any case, optionally 0x-prefixed.
pub fn parse_address(s: &str) -> Result<Address, AbiError> {
    let bytes = hex::to_bytes(s).map_err(|_| AbiError::InvalidValue {
        ty: "address".to_string(),
        reason: format!("not hex: {s}"),
    })?;
    if bytes.len() != 20 {
        return Err(AbiError::InvalidValue {
            ty: "address".to_string(),
            reason: format!("expected 20 bytes, got {}", bytes.len()),
        });
    }
    Ok(Address::from_slice(&bytes))
}

fn value_to_u256(value: &Value) -> Result<U256, AbiError> {
    match value {
        Value::String(s) => hex::to_u256(s).map_err(|e| AbiError::InvalidValue {
            ty: "uint".to_string(),
            reason: e.to_string(),
        }),
        Value::Number(n) => {
            let i = n.as_u64().ok_or_else(|| AbiError::InvalidValue {
                ty: "uint".to_string(),
                reason: "negative or non-integer uint".to_string(),
            })?;
            Ok(U256::from(i))
        }
        _ => Err(AbiError::InvalidValue { ty: "uint".to_string(), reason: "expected string or number".into() }),
    }
}

fn value_to_i256(value: &Value) -> Result<I256, AbiError> {
    match value {
        Value::String(s) => {
            let body = s.trim();
            if let Some(hex_body) = body.strip_prefix("0x").or_else(|| body.strip_prefix("-0x")) {
                let negative = body.starts_with('-');
                let magnitude = U256::from_str_radix(hex_body, 16)
                    .map_err(|e| AbiError::InvalidValue { ty: "int".to_string(), reason: e.to_string() })?;
                let v = I256::from_raw(magnitude);
                Ok(if negative { -v } else { v })
            } else {
                body.parse::<I256>()
                    .map_err(|e| AbiError::InvalidValue { ty: "int".to_string(), reason: e.to_string() })
            }
        }
        Value::Number(n) => {
            let i = n.as_i64().ok_or_else(|| AbiError::InvalidValue {
                ty: "int".to_string(),
                reason: "value does not fit in i64".to_string(),
            })?;
            Ok(I256::try_from(i).expect("i64 fits in I256"))
        }
        _ => Err(AbiError::InvalidValue { ty: "int".to_string(), reason: "expected string or number".into() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn erc20_transfer_encoding() {
        let types = vec![ParamType::Address, ParamType::Uint(256)];
        let to = parse_address("0x1234567890123456789012345678901234567890").unwrap();
        let tokens = vec![Token::Address(to), Token::Uint(U256::from(10u64).pow(U256::from(18u64)))];
        let encoded = encode(&types, &tokens).unwrap();
        assert_eq!(encoded.len(), 64);
        assert_eq!(&encoded[0..12], &[0u8; 12]);
        assert_eq!(&encoded[12..32], to.as_slice());
        assert_eq!(hex::from_bytes(&encoded[32..64]), "0x00000000000000000000000000000000000000000000000de0b6b3a7640000");
    }

    #[test]
    fn roundtrip_dynamic_tuple() {
        let types = vec![ParamType::String, ParamType::Array(Box::new(ParamType::Uint(256)))];
        let tokens = vec![
            Token::String("hello".to_string()),
            Token::Array(vec![Token::Uint(U256::from(1u64)), Token::Uint(U256::from(2u64))]),
        ];
        let encoded = encode(&types, &tokens).unwrap();
        let decoded = decode(&types, &encoded).unwrap();
        assert_eq!(decoded, tokens);
    }

    #[test]
    fn roundtrip_nested_tuple_mixed_dynamicity() {
        let inner = ParamType::Tuple(vec![ParamType::Uint(256), ParamType::String]);
        let types = vec![inner.clone(), ParamType::Bool];
        let tokens = vec![
            Token::Tuple(vec![Token::Uint(U256::from(7u64)), Token::String("x".into())]),
            Token::Bool(true),
        ];
        let encoded = encode(&types, &tokens).unwrap();
        let decoded = decode(&types, &encoded).unwrap();
        assert_eq!(decoded, tokens);
    }

    #[test]
    fn dynamic_offsets_are_32_aligned_and_past_head() {
        let types = vec![ParamType::Bytes, ParamType::Bytes];
        let tokens = vec![Token::Bytes(vec![1, 2, 3]), Token::Bytes(vec![4, 5])];
        let encoded = encode(&types, &tokens).unwrap();
        let head_size = 64;
        for i in 0..2 {
            let word = read_word(&encoded, i * 32).unwrap();
            let offset = word_to_usize(&word).unwrap();
            assert!(offset >= head_size);
            assert_eq!(offset % 32, 0);
        }
    }

    #[test]
    fn token_from_value_uint_accepts_decimal_and_hex() {
        let t1 = token_from_value(&ParamType::Uint(256), &json!("1000000000000000000")).unwrap();
        let t2 = token_from_value(&ParamType::Uint(256), &json!("0xde0b6b3a7640000")).unwrap();
        assert_eq!(t1, t2);
    }

    #[test]
    fn uint_overflow_rejected() {
        let err = token_from_value(&ParamType::Uint(8), &json!("256"));
        assert!(err.is_err());
    }
}

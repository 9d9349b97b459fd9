//! The canonical type grammar and the runtime value type (`Token`) that
//! flows through the head/tail codec.

use std::fmt;

use alloy_primitives::{Address, I256, U256};
use serde_json::Value;

use crate::error::AbiError;

/// A parameter's canonical on-wire type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Uint(usize),
    Int(usize),
    Address,
    Bool,
    Bytes,
    FixedBytes(usize),
    String,
    Array(Box<ParamType>),
    FixedArray(Box<ParamType>, usize),
    Tuple(Vec<ParamType>),
}

impl ParamType {
    /// Whether this type's encoding requires a tail slot (an offset word in
    /// the head, payload in the tail).
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::Uint(_)
            | ParamType::Int(_)
            | ParamType::Address
            | ParamType::Bool
            | ParamType::FixedBytes(_) => false,
            ParamType::Bytes | ParamType::String | ParamType::Array(_) => true,
            ParamType::FixedArray(elem, _) => elem.is_dynamic(),
            ParamType::Tuple(components) => components.iter().any(ParamType::is_dynamic),
        }
    }

    /// The number of bytes this type occupies directly in the head when
    /// static; meaningless (and unused) for dynamic types.
    pub fn static_size(&self) -> usize {
        match self {
            ParamType::Uint(_)
            | ParamType::Int(_)
            | ParamType::Address
            | ParamType::Bool
            | ParamType::FixedBytes(_) => 32,
            ParamType::FixedArray(elem, k) => elem.static_size() * k,
            ParamType::Tuple(components) => components.iter().map(ParamType::static_size).sum(),
            ParamType::Bytes | ParamType::String | ParamType::Array(_) => {
                unreachable!("static_size called on a dynamic type")
            }
        }
    }

    /// Renders the canonical signature fragment: no names, no `indexed`, no
    /// storage-location qualifiers.
    pub fn canonical(&self) -> String {
        match self {
            ParamType::Uint(n) => format!("uint{n}"),
            ParamType::Int(n) => format!("int{n}"),
            ParamType::Address => "address".to_string(),
            ParamType::Bool => "bool".to_string(),
            ParamType::Bytes => "bytes".to_string(),
            ParamType::FixedBytes(n) => format!("bytes{n}"),
            ParamType::String => "string".to_string(),
            ParamType::Array(elem) => format!("{}[]", elem.canonical()),
            ParamType::FixedArray(elem, k) => format!("{}[{k}]", elem.canonical()),
            ParamType::Tuple(components) => {
                let inner: Vec<String> = components.iter().map(ParamType::canonical).collect();
                format!("({})", inner.join(","))
            }
        }
    }

    /// Parses a canonical type string, e.g. `uint256`, `address`,
    /// `(uint256,address)[3]`, `bytes32[]`.
    pub fn parse(s: &str) -> Result<ParamType, AbiError> {
        let s = s.trim();
        // Array suffixes bind loosest; peel them off the right first.
        if let Some(open) = find_matching_array_suffix(s) {
            let (base, suffix) = s.split_at(open);
            let inner = ParamType::parse(base)?;
            let suffix = &suffix[1..suffix.len() - 1];
            return if suffix.is_empty() {
                Ok(ParamType::Array(Box::new(inner)))
            } else {
                let k: usize = suffix
                    .parse()
                    .map_err(|_| AbiError::ParseError(format!("invalid array size: {s}")))?;
                Ok(ParamType::FixedArray(Box::new(inner), k))
            };
        }
        if let Some(body) = s.strip_prefix('(') {
            let body = body
                .strip_suffix(')')
                .ok_or_else(|| AbiError::ParseError(format!("unbalanced tuple type: {s}")))?;
            let components = split_top_level(body)?
                .iter()
                .map(|c| ParamType::parse(c))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(ParamType::Tuple(components));
        }
        match s {
            "uint" => return Ok(ParamType::Uint(256)),
            "int" => return Ok(ParamType::Int(256)),
            "address" => return Ok(ParamType::Address),
            "bool" => return Ok(ParamType::Bool),
            "bytes" => return Ok(ParamType::Bytes),
            "string" => return Ok(ParamType::String),
            _ => {}
        }
        if let Some(bits) = s.strip_prefix("uint") {
            let n: usize = bits
                .parse()
                .map_err(|_| AbiError::ParseError(format!("invalid type: {s}")))?;
            return Ok(ParamType::Uint(n));
        }
        if let Some(bits) = s.strip_prefix("int") {
            let n: usize = bits
                .parse()
                .map_err(|_| AbiError::ParseError(format!("invalid type: {s}")))?;
            return Ok(ParamType::Int(n));
        }
        if let Some(n) = s.strip_prefix("bytes") {
            let n: usize = n
                .parse()
                .map_err(|_| AbiError::ParseError(format!("invalid type: {s}")))?;
            return Ok(ParamType::FixedBytes(n));
        }
        Err(AbiError::ParseError(format!("unknown type: {s}")))
    }

    /// Builds a `ParamType` from a JSON ABI fragment's `type` string plus,
    /// for `tuple`/`tuple[]`/..., its sibling `components` array.
    pub fn from_json(type_str: &str, components: Option<&[Value]>) -> Result<ParamType, AbiError> {
        let type_str = type_str.trim();
        if let Some(open) = find_matching_array_suffix(type_str) {
            let (base, suffix) = type_str.split_at(open);
            let inner = ParamType::from_json(base, components)?;
            let suffix = &suffix[1..suffix.len() - 1];
            return if suffix.is_empty() {
                Ok(ParamType::Array(Box::new(inner)))
            } else {
                let k: usize = suffix
                    .parse()
                    .map_err(|_| AbiError::ParseError(format!("invalid array size: {type_str}")))?;
                Ok(ParamType::FixedArray(Box::new(inner), k))
            };
        }
        if type_str == "tuple" {
            let components = components.ok_or_else(|| {
                AbiError::ParseError("tuple type missing components".to_string())
            })?;
            let parsed = components
                .iter()
                .map(|c| {
                    let ty = c
                        .get("type")
                        .and_then(Value::as_str)
                        .ok_or_else(|| AbiError::ParseError("component missing type".to_string()))?;
                    let sub = c.get("components").and_then(Value::as_array).map(Vec::as_slice);
                    ParamType::from_json(ty, sub)
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(ParamType::Tuple(parsed));
        }
        ParamType::parse(type_str)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Finds the `[` that opens the trailing array suffix, respecting nested
/// parens/brackets, or `None` if `s` does not end in `]`.
fn find_matching_array_suffix(s: &str) -> Option<usize> {
    if !s.ends_with(']') {
        return None;
    }
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    for i in (0..bytes.len()).rev() {
        match bytes[i] {
            b']' => depth += 1,
            b'[' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits a comma-separated type list at the top level only, respecting
/// nested `()`/`[]`.
fn split_top_level(s: &str) -> Result<Vec<String>, AbiError> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(s[start..i].to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(AbiError::ParseError(format!("unbalanced type list: {s}")));
    }
    parts.push(s[start..].to_string());
    Ok(parts)
}

/// A runtime ABI value. Values cross the Rust boundary loosely typed:
/// integers as decimal/hex strings or native integers, addresses as
/// strings, everything else structurally.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Uint(U256),
    Int(I256),
    Address(Address),
    Bool(bool),
    Bytes(Vec<u8>),
    FixedBytes(Vec<u8>),
    String(String),
    Array(Vec<Token>),
    FixedArray(Vec<Token>),
    Tuple(Vec<Token>),
}

impl Token {
    /// Renders this token the way a decoded result is presented to callers:
    /// integers as decimal strings, addresses lowercased, bytes as 0x hex.
    pub fn to_value(&self) -> Value {
        match self {
            Token::Uint(n) => Value::String(n.to_string()),
            Token::Int(n) => Value::String(n.to_string()),
            Token::Address(a) => Value::String(format!("{:#x}", a).to_lowercase()),
            Token::Bool(b) => Value::Bool(*b),
            Token::Bytes(b) | Token::FixedBytes(b) => Value::String(crate::hex::from_bytes(b)),
            Token::String(s) => Value::String(s.clone()),
            Token::Array(items) | Token::FixedArray(items) | Token::Tuple(items) => {
                Value::Array(items.iter().map(Token::to_value).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_elementary() {
        assert_eq!(ParamType::Uint(256).canonical(), "uint256");
        assert_eq!(ParamType::Address.canonical(), "address");
        assert_eq!(ParamType::FixedBytes(32).canonical(), "bytes32");
    }

    #[test]
    fn canonical_array_and_tuple() {
        let t = ParamType::Array(Box::new(ParamType::Uint(256)));
        assert_eq!(t.canonical(), "uint256[]");
        let fixed = ParamType::FixedArray(Box::new(ParamType::Address), 3);
        assert_eq!(fixed.canonical(), "address[3]");
        let tuple = ParamType::Tuple(vec![ParamType::Uint(256), ParamType::Address]);
        assert_eq!(tuple.canonical(), "(uint256,address)");
    }

    #[test]
    fn parse_roundtrip() {
        for s in ["uint256", "address", "bytes32", "bool", "string", "bytes"] {
            assert_eq!(ParamType::parse(s).unwrap().canonical(), s);
        }
        assert_eq!(
            ParamType::parse("(uint256,address)[3]").unwrap().canonical(),
            "(uint256,address)[3]"
        );
        assert_eq!(ParamType::parse("uint256[]").unwrap().canonical(), "uint256[]");
    }

    #[test]
    fn dynamicness() {
        assert!(!ParamType::Uint(256).is_dynamic());
        assert!(ParamType::Bytes.is_dynamic());
        assert!(ParamType::Array(Box::new(ParamType::Uint(8))).is_dynamic());
        assert!(ParamType::FixedArray(Box::new(ParamType::Bytes), 2).is_dynamic());
        assert!(!ParamType::FixedArray(Box::new(ParamType::Address), 2).is_dynamic());
        assert!(ParamType::Tuple(vec![ParamType::Uint(8), ParamType::String]).is_dynamic());
        assert!(!ParamType::Tuple(vec![ParamType::Uint(8), ParamType::Bool]).is_dynamic());
    }
}

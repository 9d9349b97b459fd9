//! Terse, human-readable fragment parser.
//!
//! Tokenizes by whitespace and punctuation, respecting nested `()`/`[]`, and
//! recognizes the six fragment shapes the spec lists. `memory`/`calldata`/
//! `storage` are discarded; `indexed` is lifted into the input's flag;
//! missing names become `argN`.

use super::fragment::{Fragment, Param, StateMutability};
use super::types::ParamType;
use crate::error::AbiError;

pub fn parse_fragment(raw: &str) -> Result<Fragment, AbiError> {
    let raw = raw.trim();
    if let Some(rest) = raw.strip_prefix("function ") {
        parse_function(rest.trim())
    } else if let Some(rest) = raw.strip_prefix("event ") {
        parse_event(rest.trim())
    } else if let Some(rest) = raw.strip_prefix("constructor") {
        parse_constructor(rest.trim())
    } else if let Some(rest) = raw.strip_prefix("error ") {
        parse_error(rest.trim())
    } else if raw.starts_with("receive") {
        Ok(Fragment::Receive)
    } else if let Some(rest) = raw.strip_prefix("fallback") {
        parse_fallback(rest.trim())
    } else {
        Err(AbiError::ParseError(format!("unrecognized fragment: {raw}")))
    }
}

fn parse_function(rest: &str) -> Result<Fragment, AbiError> {
    let open = rest
        .find('(')
        .ok_or_else(|| AbiError::ParseError(format!("missing '(' in function fragment: {rest}")))?;
    let name = rest[..open].trim().to_string();
    let (params_str, after) = take_balanced(&rest[open..])?;
    let inputs = parse_param_list(params_str, false)?;

    let mut state_mutability = StateMutability::Nonpayable;
    let mut outputs = Vec::new();
    let after = after.trim();
    if let Some(returns_idx) = after.find("returns") {
        for word in after[..returns_idx].split_whitespace() {
            state_mutability = merge_mutability(state_mutability, word)?;
        }
        let returns_rest = after[returns_idx + "returns".len()..].trim();
        let open = returns_rest
            .find('(')
            .ok_or_else(|| AbiError::ParseError(format!("missing '(' after returns: {after}")))?;
        let (ret_params, _) = take_balanced(&returns_rest[open..])?;
        outputs = parse_param_list(ret_params, false)?;
    } else {
        for word in after.split_whitespace() {
            state_mutability = merge_mutability(state_mutability, word)?;
        }
    }

    Ok(Fragment::Function { name, inputs, outputs, state_mutability })
}

fn parse_event(rest: &str) -> Result<Fragment, AbiError> {
    let open = rest
        .find('(')
        .ok_or_else(|| AbiError::ParseError(format!("missing '(' in event fragment: {rest}")))?;
    let name = rest[..open].trim().to_string();
    let (params_str, after) = take_balanced(&rest[open..])?;
    let inputs = parse_param_list(params_str, true)?;
    let anonymous = after.split_whitespace().any(|w| w == "anonymous");
    Ok(Fragment::Event { name, inputs, anonymous })
}

fn parse_constructor(rest: &str) -> Result<Fragment, AbiError> {
    let open = rest
        .find('(')
        .ok_or_else(|| AbiError::ParseError(format!("missing '(' in constructor fragment: {rest}")))?;
    let (params_str, after) = take_balanced(&rest[open..])?;
    let inputs = parse_param_list(params_str, false)?;
    let mut state_mutability = StateMutability::Nonpayable;
    for word in after.split_whitespace() {
        state_mutability = merge_mutability(state_mutability, word)?;
    }
    Ok(Fragment::Constructor { inputs, state_mutability })
}

fn parse_error(rest: &str) -> Result<Fragment, AbiError> {
    let open = rest
        .find('(')
        .ok_or_else(|| AbiError::ParseError(format!("missing '(' in error fragment: {rest}")))?;
    let name = rest[..open].trim().to_string();
    let (params_str, _) = take_balanced(&rest[open..])?;
    let inputs = parse_param_list(params_str, false)?;
    Ok(Fragment::Error { name, inputs })
}

fn parse_fallback(rest: &str) -> Result<Fragment, AbiError> {
    let rest = rest.trim_start_matches("()").trim();
    let mut state_mutability = StateMutability::Nonpayable;
    for word in rest.split_whitespace() {
        state_mutability = merge_mutability(state_mutability, word)?;
    }
    Ok(Fragment::Fallback { state_mutability })
}

fn merge_mutability(current: StateMutability, word: &str) -> Result<StateMutability, AbiError> {
    match word {
        "view" => Ok(StateMutability::View),
        "pure" => Ok(StateMutability::Pure),
        "payable" => Ok(StateMutability::Payable),
        "external" | "public" => Ok(current),
        _ => Ok(current),
    }
}

/// Splits `s`, which must start with `(`, into the content between the
/// matching close paren and whatever follows it.
fn take_balanced(s: &str) -> Result<(&str, &str), AbiError> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'(') {
        return Err(AbiError::ParseError(format!("expected '(': {s}")));
    }
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&s[1..i], &s[i + 1..]));
                }
            }
            _ => {}
        }
    }
    Err(AbiError::ParseError(format!("unbalanced parens: {s}")))
}

/// Splits a parameter list on top-level commas, respecting nested `()`/`[]`.
fn split_top_level_params(s: &str) -> Vec<&str> {
    let s = s.trim();
    if s.is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts
}

fn parse_param_list(params_str: &str, allow_indexed: bool) -> Result<Vec<Param>, AbiError> {
    split_top_level_params(params_str)
        .into_iter()
        .enumerate()
        .map(|(i, raw)| parse_param(raw, i, allow_indexed))
        .collect()
}

fn parse_param(raw: &str, position: usize, allow_indexed: bool) -> Result<Param, AbiError> {
    let raw = raw.trim();
    let type_end = find_type_end(raw);
    let type_str = &raw[..type_end];
    let ty = ParamType::parse(type_str)?;

    let mut indexed = false;
    let mut name = String::new();
    for token in raw[type_end..].split_whitespace() {
        match token {
            "indexed" if allow_indexed => indexed = true,
            "memory" | "calldata" | "storage" => {}
            other => name = other.to_string(),
        }
    }
    if name.is_empty() {
        name = format!("arg{position}");
    }
    Ok(Param { name, ty, indexed })
}

/// Finds where the type token ends: the first top-level (depth-0)
/// whitespace, since a tuple type like `(uint256,address)` may itself
/// contain spaces after commas.
fn find_type_end(s: &str) -> usize {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            c if c.is_whitespace() && depth == 0 => return i,
            _ => {}
        }
    }
    s.len()
}

//! Decimal unit conversion and EIP-55 address checksumming.

use alloy_primitives::{keccak256, Address, U256};

use crate::error::{Error, ErrorKind};
use crate::hex;

/// Parses a decimal string (optionally with a fractional part) into a
/// `U256` scaled by `10^decimals`, e.g. `parse_units("1.5", 18)` for wei.
pub fn parse_units(value: &str, decimals: u32) -> Result<U256, Error> {
    let value = value.trim();
    let negative = value.starts_with('-');
    if negative {
        return Err(Error::new(ErrorKind::InvalidArgument).with_message("negative amounts are not supported"));
    }
    let (whole, frac) = match value.split_once('.') {
        Some((w, f)) => (w, f),
        None => (value, ""),
    };
    if frac.len() > decimals as usize {
        return Err(Error::new(ErrorKind::InvalidArgument)
            .with_message(format!("value has more than {decimals} fractional digits")));
    }
    let whole: U256 = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10)
            .map_err(|e| Error::new(ErrorKind::InvalidArgument).with_message(e.to_string()))?
    };
    let scale = U256::from(10u8).pow(U256::from(decimals));
    let mut total = whole * scale;
    if !frac.is_empty() {
        let frac_value = U256::from_str_radix(frac, 10)
            .map_err(|e| Error::new(ErrorKind::InvalidArgument).with_message(e.to_string()))?;
        let frac_scale = U256::from(10u8).pow(U256::from(decimals as usize - frac.len()));
        total += frac_value * frac_scale;
    }
    Ok(total)
}

/// Formats `value` (scaled by `10^decimals`) as a decimal string, trimming
/// trailing fractional zeros (but never the decimal point's leading digit).
pub fn format_units(value: U256, decimals: u32) -> String {
    let scale = U256::from(10u8).pow(U256::from(decimals));
    let whole = value / scale;
    let remainder = value % scale;
    if decimals == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", remainder, width = decimals as usize);
    let frac_trimmed = frac.trim_end_matches('0');
    if frac_trimmed.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{frac_trimmed}")
    }
}

/// Renders `address` with EIP-55 mixed-case checksumming.
pub fn to_checksum(address: Address) -> String {
    let lower = hex::from_bytes(address.as_slice());
    let lower_digits = &lower[2..];
    let hash = keccak256(lower_digits.as_bytes());
    let hash_hex = hex::from_bytes(hash.as_slice());
    let hash_digits = &hash_hex[2..];

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (c, h) in lower_digits.chars().zip(hash_digits.chars()) {
        if c.is_ascii_digit() {
            out.push(c);
        } else {
            let nibble = h.to_digit(16).unwrap_or(0);
            if nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
    }
    out
}

/// Whether `s` is a syntactically valid address: 40 hex digits, optionally
/// `0x`-prefixed. Does not require (or reject) EIP-55 casing.
pub fn is_address(s: &str) -> bool {
    let body = hex::strip_0x(s);
    body.len() == 40 && body.chars().all(|c| c.is_ascii_hexdigit())
}

/// Whether `s` is a validly-checksummed address per EIP-55. A fully
/// lowercase or fully uppercase address is accepted as "not checksummed"
/// by convention, not as a checksum failure.
pub fn is_checksum_address(s: &str) -> bool {
    if !is_address(s) {
        return false;
    }
    let body = hex::strip_0x(s);
    if body == body.to_lowercase() || body == body.to_uppercase() {
        return true;
    }
    match crate::abi::parse_address(s) {
        Ok(addr) => to_checksum(addr) == hex::with_0x(body),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_units_whole_and_fractional() {
        assert_eq!(parse_units("1", 18).unwrap(), U256::from(10u8).pow(U256::from(18u8)));
        assert_eq!(parse_units("1.5", 18).unwrap(), U256::from(15u8) * U256::from(10u8).pow(U256::from(17u8)));
    }

    #[test]
    fn parse_units_rejects_too_many_fractional_digits() {
        assert!(parse_units("1.0000001", 6).is_err());
    }

    #[test]
    fn format_units_roundtrips_parse_units() {
        let n = parse_units("1.5", 18).unwrap();
        assert_eq!(format_units(n, 18), "1.5");
        assert_eq!(format_units(U256::from(10u8).pow(U256::from(18u8)), 18), "1");
    }

    #[test]
    fn checksum_known_address() {
        let addr = crate::abi::parse_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        assert_eq!(to_checksum(addr), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }

    #[test]
    fn is_address_accepts_with_and_without_prefix() {
        assert!(is_address("1234567890123456789012345678901234567890"));
        assert!(is_address("0x1234567890123456789012345678901234567890"));
        assert!(!is_address("0x123"));
    }
}

//! JSON-RPC error classification.
//!
//! Classification order is fixed: revert short-circuit first, then
//! insufficient funds, then the nonce family, then replacement-underpriced,
//! then a generic server error. EIP-1474 codes `3` and `-32000` always
//! classify as `CALL_EXCEPTION` regardless of message text.

use serde_json::Value;

use crate::error::{Error, ErrorKind};
use crate::hex;

const STANDARD_ERROR_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// The `error` member of a JSON-RPC response.
#[derive(Debug, Clone)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

/// Classifies a raw JSON-RPC error object into this crate's closed
/// [`ErrorKind`] taxonomy.
pub fn classify(err: &RpcErrorObject) -> Error {
    if err.code == 3 || err.code == -32000 {
        let (reason, data) = parse_revert_data(err.data.as_ref());
        return Error::call_exception("call", data, reason)
            .with_info("code", err.code)
            .with_message(err.message.clone());
    }

    let lower = err.message.to_lowercase();
    let kind = if lower.contains("insufficient funds") {
        ErrorKind::InsufficientFunds
    } else if lower.contains("nonce too low") || lower.contains("nonce too high") || lower.contains("already known") {
        ErrorKind::NonceExpired
    } else if lower.contains("replacement transaction underpriced") {
        ErrorKind::ReplacementUnderpriced
    } else {
        ErrorKind::ServerError
    };
    Error::new(kind).with_message(err.message.clone()).with_info("code", err.code)
}

/// Attempts to pull a human-readable revert reason out of `data`, which is
/// expected to be a `0x`-prefixed hex string possibly carrying the standard
/// `Error(string)` selector.
fn parse_revert_data(data: Option<&Value>) -> (Option<String>, Option<Vec<u8>>) {
    let s = match data.and_then(Value::as_str) {
        Some(s) => s,
        None => return (None, None),
    };
    let bytes = match hex::to_bytes(s) {
        Ok(b) => b,
        Err(_) => return (None, None),
    };
    if bytes.len() >= 4 && bytes[..4] == STANDARD_ERROR_SELECTOR {
        if let Ok(tokens) = crate::abi::decode(&[crate::abi::ParamType::String], &bytes[4..]) {
            if let crate::abi::Token::String(reason) = &tokens[0] {
                return (Some(reason.clone()), Some(bytes));
            }
        }
    }
    (None, Some(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn code_three_is_call_exception_regardless_of_message() {
        let err = RpcErrorObject { code: 3, message: "execution reverted".to_string(), data: None };
        assert_eq!(classify(&err).kind, ErrorKind::CallException);
    }

    #[test]
    fn insufficient_funds_classified() {
        let err =
            RpcErrorObject { code: -32000, message: "insufficient funds for gas * price + value".to_string(), data: None };
        // -32000 always short-circuits to CALL_EXCEPTION, even though the
        // text also matches "insufficient funds" — code wins.
        assert_eq!(classify(&err).kind, ErrorKind::CallException);
    }

    #[test]
    fn insufficient_funds_without_short_circuit_code() {
        let err = RpcErrorObject { code: -32003, message: "insufficient funds for transfer".to_string(), data: None };
        assert_eq!(classify(&err).kind, ErrorKind::InsufficientFunds);
    }

    #[test]
    fn nonce_too_low_classified() {
        let err = RpcErrorObject { code: -32003, message: "nonce too low".to_string(), data: None };
        assert_eq!(classify(&err).kind, ErrorKind::NonceExpired);
    }

    #[test]
    fn replacement_underpriced_classified() {
        let err =
            RpcErrorObject { code: -32003, message: "replacement transaction underpriced".to_string(), data: None };
        assert_eq!(classify(&err).kind, ErrorKind::ReplacementUnderpriced);
    }

    #[test]
    fn unmatched_message_is_generic_server_error() {
        let err = RpcErrorObject { code: -32099, message: "something unexpected".to_string(), data: None };
        assert_eq!(classify(&err).kind, ErrorKind::ServerError);
    }

    #[test]
    fn revert_reason_decoded_from_standard_error_selector() {
        let mut data = STANDARD_ERROR_SELECTOR.to_vec();
        let tokens = [crate::abi::Token::String("too low".to_string())];
        data.extend(crate::abi::encode(&[crate::abi::ParamType::String], &tokens).unwrap());
        let err = RpcErrorObject {
            code: 3,
            message: "execution reverted".to_string(),
            data: Some(json!(hex::from_bytes(&data))),
        };
        let classified = classify(&err);
        assert_eq!(classified.reason.as_deref(), Some("too low"));
    }
}

//! The closed error taxonomy every fallible operation in this crate returns.
//!
//! Every fallible operation in this crate returns `Result<T, Error>`. `Error`
//! wraps a tagged [`ErrorKind`] plus the structured `info` map and, for
//! revert-class errors, the parsed `reason` and raw `data`. Sub-concern
//! errors (`abi::AbiError`, `rpc::RpcErrorObject`, `tx::SignerError`) are
//! `thiserror` enums that fold into this taxonomy via `From`.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error as ThisError;

/// The closed set of error kinds this crate's operations can fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum ErrorKind {
    #[error("call exception")]
    CallException,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("nonce expired")]
    NonceExpired,
    #[error("replacement transaction underpriced")]
    ReplacementUnderpriced,
    #[error("transaction replaced")]
    TransactionReplaced,
    #[error("server error")]
    ServerError,
    #[error("network error")]
    NetworkError,
    #[error("timeout")]
    Timeout,
    #[error("bad data")]
    BadData,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("unsupported operation")]
    UnsupportedOperation,
    #[error("cancelled")]
    Cancelled,
    #[error("unknown error")]
    UnknownError,
}

/// A structured, taggable error. The only failure channel in this crate —
/// there are no sentinel return values.
#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub short_message: String,
    pub info: BTreeMap<String, Value>,
    /// Parsed revert reason, set only for `CALL_EXCEPTION`-class errors.
    pub reason: Option<String>,
    /// Raw revert/return data, set only for `CALL_EXCEPTION`-class errors.
    pub data: Option<Vec<u8>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        let short_message = kind.to_string();
        Self {
            kind,
            message: short_message.clone(),
            short_message,
            info: BTreeMap::new(),
            reason: None,
            data: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn call_exception(action: &str, data: Option<Vec<u8>>, reason: Option<String>) -> Self {
        let mut e = Error::new(ErrorKind::CallException).with_info("action", action);
        if let Some(d) = data {
            e = e.with_data(d);
        }
        if let Some(r) = reason {
            e = e.with_message(format!("execution reverted: {r}")).with_reason(r);
        } else {
            e = e.with_message("execution reverted".to_string());
        }
        e
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

/// Sub-concern error for the ABI codec. Malformed wire data (calldata that
/// doesn't fit the shape a type expects) is `BadData`. Everything else is
/// `InvalidArgument`: a caller passing an argument that doesn't fit the
/// declared type, an unknown or ambiguous fragment name, a malformed
/// human-readable signature.
#[derive(Debug, Clone, ThisError)]
pub enum AbiError {
    #[error("unknown fragment: {0}")]
    UnknownFragment(String),
    #[error("ambiguous fragment name: {0}")]
    AmbiguousFragment(String),
    #[error("argument count mismatch: expected {expected}, got {got}")]
    ArityMismatch { expected: usize, got: usize },
    #[error("malformed calldata: {0}")]
    MalformedData(String),
    #[error("invalid value for type {ty}: {reason}")]
    InvalidValue { ty: String, reason: String },
    #[error("invalid UTF-8 in decoded string")]
    InvalidUtf8,
    #[error("failed to parse human-readable fragment: {0}")]
    ParseError(String),
}

impl From<AbiError> for Error {
    fn from(e: AbiError) -> Self {
        let kind = match &e {
            AbiError::UnknownFragment(_)
            | AbiError::AmbiguousFragment(_)
            | AbiError::ArityMismatch { .. }
            | AbiError::ParseError(_)
            | AbiError::InvalidValue { .. } => ErrorKind::InvalidArgument,
            AbiError::MalformedData(_) | AbiError::InvalidUtf8 => ErrorKind::BadData,
        };
        Error::new(kind).with_message(e.to_string())
    }
}

/// Sub-concern error for transaction signing.
#[derive(Debug, ThisError)]
pub enum SignerError {
    #[error("signing primitive failed: {0}")]
    Ecdsa(#[from] k256::ecdsa::Error),
    #[error("no transport bound to this account")]
    Unbound,
    #[error("invalid private key")]
    InvalidKey,
}

impl From<SignerError> for Error {
    fn from(e: SignerError) -> Self {
        let kind = match &e {
            SignerError::Unbound => ErrorKind::UnsupportedOperation,
            SignerError::Ecdsa(_) | SignerError::InvalidKey => ErrorKind::InvalidArgument,
        };
        Error::new(kind).with_message(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_message() {
        let e = Error::new(ErrorKind::Timeout).with_message("deadline exceeded after 60s");
        assert_eq!(e.to_string(), "deadline exceeded after 60s");
    }

    #[test]
    fn call_exception_carries_reason_and_data() {
        let e = Error::call_exception("call", Some(vec![1, 2, 3]), Some("too low!".into()));
        assert_eq!(e.kind, ErrorKind::CallException);
        assert_eq!(e.reason.as_deref(), Some("too low!"));
        assert_eq!(e.data, Some(vec![1, 2, 3]));
    }
}

//! `Interface`: a parsed contract description plus lookup/encode/decode
//! operations.

use alloy_primitives::{keccak256, B256};
use serde_json::Value;

use super::codec;
use super::fragment::Fragment;
use super::human;
use super::types::{ParamType, Token};
use crate::error::{AbiError, Error, ErrorKind};

/// Selector of the standard `Error(string)` revert reason.
const STANDARD_ERROR_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
/// Selector of the standard `Panic(uint256)` revert reason.
const STANDARD_PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// How [`Interface::format`] renders the fragment list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatStyle {
    Minimal,
    Full,
    Json,
}

/// A parsed contract description: the set of fragments plus lookup and
/// codec operations against them.
#[derive(Debug, Clone)]
pub struct Interface {
    fragments: Vec<Fragment>,
}

impl Interface {
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Self { fragments }
    }

    /// Parses a human-readable fragment list, one entry per line.
    pub fn parse_human<S: AsRef<str>>(lines: &[S]) -> Result<Self, AbiError> {
        let fragments = lines.iter().map(|l| human::parse_fragment(l.as_ref())).collect::<Result<_, _>>()?;
        Ok(Self { fragments })
    }

    /// Parses a JSON ABI array.
    pub fn from_json(value: &Value) -> Result<Self, AbiError> {
        let arr = value
            .as_array()
            .ok_or_else(|| AbiError::ParseError("ABI JSON must be an array".to_string()))?;
        let fragments = arr.iter().map(Fragment::from_json).collect::<Result<_, _>>()?;
        Ok(Self { fragments })
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    fn functions(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter().filter(|f| matches!(f, Fragment::Function { .. }))
    }

    fn events(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter().filter(|f| matches!(f, Fragment::Event { .. }))
    }

    fn errors(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter().filter(|f| matches!(f, Fragment::Error { .. }))
    }

    /// Resolves `key` — a bare name or a full `name(type,type)` signature —
    /// against a fragment iterator, erroring on zero or ambiguous matches.
    fn resolve<'a>(
        &self,
        key: &str,
        mut candidates: impl Iterator<Item = &'a Fragment>,
    ) -> Result<&'a Fragment, AbiError> {
        if key.contains('(') {
            return candidates
                .find(|f| f.canonical_signature().as_deref() == Some(key))
                .ok_or_else(|| AbiError::UnknownFragment(key.to_string()));
        }
        let matches: Vec<&Fragment> = candidates.filter(|f| f.name() == Some(key)).collect();
        match matches.len() {
            0 => Err(AbiError::UnknownFragment(key.to_string())),
            1 => Ok(matches[0]),
            _ => Err(AbiError::AmbiguousFragment(key.to_string())),
        }
    }

    pub fn function(&self, name_or_sig: &str) -> Result<&Fragment, AbiError> {
        self.resolve(name_or_sig, self.functions())
    }

    pub fn event(&self, name_or_sig: &str) -> Result<&Fragment, AbiError> {
        self.resolve(name_or_sig, self.events())
    }

    pub fn error_fragment(&self, name_or_sig: &str) -> Result<&Fragment, AbiError> {
        self.resolve(name_or_sig, self.errors())
    }

    pub fn function_by_selector(&self, selector: [u8; 4]) -> Result<&Fragment, AbiError> {
        self.functions()
            .find(|f| f.selector() == Some(selector))
            .ok_or_else(|| AbiError::UnknownFragment(::hex::encode(selector)))
    }

    pub fn event_by_topic(&self, topic: B256) -> Result<&Fragment, AbiError> {
        self.events()
            .find(|f| f.topic() == Some(topic))
            .ok_or_else(|| AbiError::UnknownFragment(::hex::encode(topic)))
    }

    fn input_types(frag: &Fragment) -> Vec<ParamType> {
        frag.inputs().iter().map(|p| p.ty.clone()).collect()
    }

    fn output_types(frag: &Fragment) -> Vec<ParamType> {
        frag.outputs().iter().map(|p| p.ty.clone()).collect()
    }

    fn tokens_from_values(types: &[ParamType], args: &[Value]) -> Result<Vec<Token>, AbiError> {
        if types.len() != args.len() {
            return Err(AbiError::ArityMismatch { expected: types.len(), got: args.len() });
        }
        types.iter().zip(args).map(|(ty, v)| codec::token_from_value(ty, v)).collect()
    }

    /// Encodes a function call: 4-byte selector followed by head/tail
    /// encoded arguments.
    pub fn encode_function_data(&self, name_or_sig: &str, args: &[Value]) -> Result<Vec<u8>, Error> {
        let frag = self.function(name_or_sig)?;
        let types = Self::input_types(frag);
        let tokens = Self::tokens_from_values(&types, args)?;
        let selector = frag.selector().expect("function fragments always have a selector");
        let mut out = selector.to_vec();
        out.extend(codec::encode(&types, &tokens)?);
        Ok(out)
    }

    /// Decodes a function call's calldata, validating the leading selector.
    pub fn decode_function_data(&self, name_or_sig: &str, data: &[u8]) -> Result<Vec<Value>, Error> {
        let frag = self.function(name_or_sig)?;
        let selector = frag.selector().expect("function fragments always have a selector");
        let body = data.strip_prefix(selector.as_slice()).ok_or_else(|| {
            Error::new(ErrorKind::BadData).with_message("calldata selector does not match function")
        })?;
        let types = Self::input_types(frag);
        let tokens = codec::decode(&types, body)?;
        Ok(tokens.iter().map(Token::to_value).collect())
    }

    /// Decodes a function call's return data against its declared outputs.
    pub fn decode_function_result(&self, name_or_sig: &str, data: &[u8]) -> Result<Vec<Value>, Error> {
        let frag = self.function(name_or_sig)?;
        let types = Self::output_types(frag);
        let tokens = codec::decode(&types, data)?;
        Ok(tokens.iter().map(Token::to_value).collect())
    }

    /// Encodes deployment data: contract bytecode followed by ABI-encoded
    /// constructor arguments, if the interface declares a constructor.
    pub fn encode_deploy(&self, bytecode: &[u8], args: &[Value]) -> Result<Vec<u8>, Error> {
        let mut out = bytecode.to_vec();
        match self.fragments.iter().find(|f| matches!(f, Fragment::Constructor { .. })) {
            Some(frag) => {
                let types = Self::input_types(frag);
                let tokens = Self::tokens_from_values(&types, args)?;
                out.extend(codec::encode(&types, &tokens)?);
            }
            None if args.is_empty() => {}
            None => {
                return Err(Error::new(ErrorKind::InvalidArgument)
                    .with_message("constructor arguments given but interface declares no constructor"))
            }
        }
        Ok(out)
    }

    /// Encodes the topic filter for an event: `topics[0]` is the event
    /// signature hash (absent for anonymous events); each subsequent slot is
    /// `Some(topic)` for a provided indexed argument or `None` as a wildcard.
    ///
    /// Reference-typed (dynamic) indexed arguments are matched against
    /// `keccak256` of their standard encoding, per how the EVM itself stores
    /// them — there is no way to recover the original value from a log, only
    /// to test candidate values against the stored hash.
    pub fn encode_event_topics(&self, name_or_sig: &str, args: &[Option<Value>]) -> Result<Vec<Option<B256>>, Error> {
        let frag = self.event(name_or_sig)?;
        let (inputs, anonymous) = match frag {
            Fragment::Event { inputs, anonymous, .. } => (inputs, *anonymous),
            _ => unreachable!("resolve() only returns events here"),
        };
        let indexed: Vec<_> = inputs.iter().filter(|p| p.indexed).collect();
        if args.len() > indexed.len() {
            return Err(Error::new(ErrorKind::InvalidArgument)
                .with_message("more topic arguments than indexed parameters"));
        }

        let mut topics = Vec::with_capacity(indexed.len() + 1);
        if !anonymous {
            topics.push(frag.topic());
        }
        for (param, arg) in indexed.iter().zip(args) {
            match arg {
                None => topics.push(None),
                Some(value) => {
                    let token = codec::token_from_value(&param.ty, value)?;
                    let topic = if param.ty.is_dynamic() {
                        keccak256(codec::encode_single(&param.ty, &token))
                    } else {
                        B256::from_slice(&codec::encode_single(&param.ty, &token))
                    };
                    topics.push(Some(topic));
                }
            }
        }
        Ok(topics)
    }

    /// Decodes a log's topics and data back into the event's declared
    /// parameter order. Indexed reference-typed parameters decode to their
    /// stored `keccak256` hash, not the original value (see
    /// [`Interface::encode_event_topics`]).
    pub fn decode_event_log(&self, name_or_sig: &str, topics: &[B256], data: &[u8]) -> Result<Vec<Value>, Error> {
        let frag = self.event(name_or_sig)?;
        let (inputs, anonymous) = match frag {
            Fragment::Event { inputs, anonymous, .. } => (inputs, *anonymous),
            _ => unreachable!("resolve() only returns events here"),
        };

        let mut topic_iter = topics.iter();
        if !anonymous {
            topic_iter.next();
        }

        let non_indexed_types: Vec<ParamType> =
            inputs.iter().filter(|p| !p.indexed).map(|p| p.ty.clone()).collect();
        let non_indexed_tokens = codec::decode(&non_indexed_types, data)?;
        let mut non_indexed_iter = non_indexed_tokens.into_iter();

        let mut out = Vec::with_capacity(inputs.len());
        for param in inputs {
            if param.indexed {
                let topic = topic_iter
                    .next()
                    .ok_or_else(|| Error::new(ErrorKind::BadData).with_message("log is missing an indexed topic"))?;
                let token = if param.ty.is_dynamic() {
                    Token::FixedBytes(topic.as_slice().to_vec())
                } else {
                    codec::decode_single(&param.ty, topic.as_slice())?
                };
                out.push(token.to_value());
            } else {
                let token = non_indexed_iter
                    .next()
                    .ok_or_else(|| Error::new(ErrorKind::BadData).with_message("log data is short"))?;
                out.push(token.to_value());
            }
        }
        Ok(out)
    }

    /// Decodes a revert payload: the standard `Error(string)`/`Panic(uint256)`
    /// selectors, or a custom error declared on this interface.
    pub fn decode_error_result(&self, data: &[u8]) -> Result<Value, Error> {
        if data.len() < 4 {
            return Err(Error::new(ErrorKind::BadData).with_message("revert data is shorter than a selector"));
        }
        let selector: [u8; 4] = data[..4].try_into().expect("checked len");
        let body = &data[4..];
        if selector == STANDARD_ERROR_SELECTOR {
            let tokens = codec::decode(&[ParamType::String], body)?;
            return Ok(serde_json::json!({ "name": "Error", "args": [tokens[0].to_value()] }));
        }
        if selector == STANDARD_PANIC_SELECTOR {
            let tokens = codec::decode(&[ParamType::Uint(256)], body)?;
            return Ok(serde_json::json!({ "name": "Panic", "args": [tokens[0].to_value()] }));
        }
        let frag = self.function_by_custom_error_selector(selector)?;
        let types = Self::input_types(frag);
        let tokens = codec::decode(&types, body)?;
        Ok(serde_json::json!({
            "name": frag.name(),
            "args": tokens.iter().map(Token::to_value).collect::<Vec<_>>(),
        }))
    }

    fn function_by_custom_error_selector(&self, selector: [u8; 4]) -> Result<&Fragment, AbiError> {
        self.errors()
            .find(|f| f.selector() == Some(selector))
            .ok_or_else(|| AbiError::UnknownFragment(::hex::encode(selector)))
    }

    /// Renders the whole interface as a minimal/full human-readable
    /// fragment list, or as a JSON ABI array.
    pub fn format(&self, style: FormatStyle) -> Value {
        match style {
            FormatStyle::Minimal | FormatStyle::Full => {
                Value::Array(self.fragments.iter().map(|f| Value::String(f.to_human())).collect())
            }
            FormatStyle::Json => Value::Array(self.fragments.iter().map(Fragment::to_json).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn erc20() -> Interface {
        Interface::parse_human(&[
            "function transfer(address to, uint256 amount) returns (bool)",
            "function balanceOf(address owner) view returns (uint256)",
            "event Transfer(address indexed from, address indexed to, uint256 value)",
            "error InsufficientBalance(uint256 available, uint256 required)",
        ])
        .unwrap()
    }

    #[test]
    fn encodes_and_decodes_function_call() {
        let iface = erc20();
        let to = "0x1234567890123456789012345678901234567890";
        let data = iface
            .encode_function_data("transfer", &[json!(to), json!("1000000000000000000")])
            .unwrap();
        assert_eq!(&data[0..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        let decoded = iface.decode_function_data("transfer", &data).unwrap();
        assert_eq!(decoded[0], json!(to));
        assert_eq!(decoded[1], json!("1000000000000000000"));
    }

    #[test]
    fn rejects_selector_mismatch() {
        let iface = erc20();
        let data = iface.encode_function_data("balanceOf", &[json!("0x1234567890123456789012345678901234567890")]).unwrap();
        assert!(iface.decode_function_data("transfer", &data).is_err());
    }

    #[test]
    fn event_topics_hash_value_types_directly() {
        let iface = erc20();
        let from = "0x1111111111111111111111111111111111111111";
        let to = "0x2222222222222222222222222222222222222222";
        let topics = iface
            .encode_event_topics("Transfer", &[Some(json!(from)), Some(json!(to)), None])
            .unwrap();
        assert_eq!(topics.len(), 3);
        assert_eq!(
            ::hex::encode(topics[0].unwrap()),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
        assert!(topics[1].is_some());
        assert!(topics[2].is_none());
    }

    #[test]
    fn decode_event_log_roundtrips_non_indexed_value() {
        let iface = erc20();
        let from = "0x1111111111111111111111111111111111111111";
        let to = "0x2222222222222222222222222222222222222222";
        let value = json!("42");
        let topics = iface.encode_event_topics("Transfer", &[Some(json!(from)), Some(json!(to))]).unwrap();
        let topics: Vec<B256> = topics.into_iter().map(Option::unwrap).collect();
        let types = [ParamType::Uint(256)];
        let tokens = [codec::token_from_value(&ParamType::Uint(256), &value).unwrap()];
        let data = codec::encode(&types, &tokens).unwrap();
        let decoded = iface.decode_event_log("Transfer", &topics, &data).unwrap();
        assert_eq!(decoded[2], value);
    }

    #[test]
    fn decodes_standard_error_string() {
        let iface = erc20();
        let mut data = STANDARD_ERROR_SELECTOR.to_vec();
        let tokens = [Token::String("insufficient allowance".to_string())];
        data.extend(codec::encode(&[ParamType::String], &tokens).unwrap());
        let decoded = iface.decode_error_result(&data).unwrap();
        assert_eq!(decoded["name"], "Error");
        assert_eq!(decoded["args"][0], "insufficient allowance");
    }

    #[test]
    fn decodes_custom_error() {
        let iface = erc20();
        let frag = iface.error_fragment("InsufficientBalance").unwrap();
        let selector = frag.selector().unwrap();
        let mut data = selector.to_vec();
        let types = [ParamType::Uint(256), ParamType::Uint(256)];
        let tokens = [Token::Uint(alloy_primitives::U256::from(1u8)), Token::Uint(alloy_primitives::U256::from(2u8))];
        data.extend(codec::encode(&types, &tokens).unwrap());
        let decoded = iface.decode_error_result(&data).unwrap();
        assert_eq!(decoded["name"], "InsufficientBalance");
    }

    #[test]
    fn ambiguous_overload_name_lookup_errors() {
        let iface = Interface::parse_human(&[
            "function set(uint256 value)",
            "function set(uint256 value, bool flag)",
        ])
        .unwrap();
        assert!(iface.function("set").is_err());
        assert!(iface.function("set(uint256)").is_ok());
    }

    #[test]
    fn json_roundtrip() {
        let iface = erc20();
        let json_value = iface.format(FormatStyle::Json);
        let reparsed = Interface::from_json(&json_value).unwrap();
        assert_eq!(reparsed.fragments().len(), iface.fragments().len());
    }
}

//! Fragment: one element of a contract description.

use alloy_primitives::{keccak256, B256};
use serde_json::Value;

use super::types::ParamType;
use crate::error::AbiError;

/// Mutability modifiers recognized on functions/constructors/fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateMutability {
    Pure,
    View,
    Nonpayable,
    Payable,
}

impl StateMutability {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateMutability::Pure => "pure",
            StateMutability::View => "view",
            StateMutability::Nonpayable => "nonpayable",
            StateMutability::Payable => "payable",
        }
    }
}

/// One input/output parameter of a fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: ParamType,
    /// Only meaningful on event inputs; `false` everywhere else.
    pub indexed: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self { name: name.into(), ty, indexed: false }
    }

    pub fn indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    /// Renders as a human-readable parameter: `type [indexed] name`.
    fn human(&self) -> String {
        if self.indexed {
            format!("{} indexed {}", self.ty.canonical(), self.name)
        } else if self.name.is_empty() {
            self.ty.canonical()
        } else {
            format!("{} {}", self.ty.canonical(), self.name)
        }
    }

    fn to_json(&self, include_indexed: bool) -> Value {
        let mut obj = serde_json::json!({
            "name": self.name,
            "type": self.ty.canonical(),
        });
        if let ParamType::Tuple(components) = &self.ty {
            obj["components"] = Value::Array(
                components
                    .iter()
                    .enumerate()
                    .map(|(i, c)| serde_json::json!({"name": format!("arg{i}"), "type": c.canonical()}))
                    .collect(),
            );
        }
        if include_indexed {
            obj["indexed"] = Value::Bool(self.indexed);
        }
        obj
    }

    fn from_json(value: &Value, allow_indexed: bool) -> Result<Param, AbiError> {
        let ty_str = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| AbiError::ParseError("parameter missing type".to_string()))?;
        let components = value.get("components").and_then(Value::as_array).map(Vec::as_slice);
        let ty = ParamType::from_json(ty_str, components)?;
        let name = value.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
        let indexed = allow_indexed && value.get("indexed").and_then(Value::as_bool).unwrap_or(false);
        Ok(Param { name, ty, indexed })
    }
}

/// One element of an ABI description.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Function {
        name: String,
        inputs: Vec<Param>,
        outputs: Vec<Param>,
        state_mutability: StateMutability,
    },
    Event {
        name: String,
        inputs: Vec<Param>,
        anonymous: bool,
    },
    Constructor {
        inputs: Vec<Param>,
        state_mutability: StateMutability,
    },
    Error {
        name: String,
        inputs: Vec<Param>,
    },
    Receive,
    Fallback {
        state_mutability: StateMutability,
    },
}

impl Fragment {
    pub fn name(&self) -> Option<&str> {
        match self {
            Fragment::Function { name, .. } => Some(name),
            Fragment::Event { name, .. } => Some(name),
            Fragment::Error { name, .. } => Some(name),
            Fragment::Constructor { .. } | Fragment::Receive | Fragment::Fallback { .. } => None,
        }
    }

    pub fn inputs(&self) -> &[Param] {
        match self {
            Fragment::Function { inputs, .. }
            | Fragment::Event { inputs, .. }
            | Fragment::Constructor { inputs, .. }
            | Fragment::Error { inputs, .. } => inputs,
            Fragment::Receive | Fragment::Fallback { .. } => &[],
        }
    }

    pub fn outputs(&self) -> &[Param] {
        match self {
            Fragment::Function { outputs, .. } => outputs,
            _ => &[],
        }
    }

    pub fn state_mutability(&self) -> StateMutability {
        match self {
            Fragment::Function { state_mutability, .. }
            | Fragment::Constructor { state_mutability, .. }
            | Fragment::Fallback { state_mutability } => *state_mutability,
            Fragment::Receive => StateMutability::Payable,
            Fragment::Event { .. } | Fragment::Error { .. } => StateMutability::Nonpayable,
        }
    }

    /// The `type` discriminant as it appears in both JSON ABI and the
    /// minimal human-readable form.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Fragment::Function { .. } => "function",
            Fragment::Event { .. } => "event",
            Fragment::Constructor { .. } => "constructor",
            Fragment::Error { .. } => "error",
            Fragment::Receive => "receive",
            Fragment::Fallback { .. } => "fallback",
        }
    }

    /// Builds a `Fragment` from one entry of a JSON ABI array.
    pub fn from_json(value: &Value) -> Result<Fragment, AbiError> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| AbiError::ParseError("fragment missing type".to_string()))?;
        let name = || -> String { value.get("name").and_then(Value::as_str).unwrap_or_default().to_string() };
        let parse_params = |key: &str, allow_indexed: bool| -> Result<Vec<Param>, AbiError> {
            match value.get(key).and_then(Value::as_array) {
                Some(arr) => arr.iter().map(|p| Param::from_json(p, allow_indexed)).collect(),
                None => Ok(Vec::new()),
            }
        };
        let state_mutability = || -> StateMutability {
            match value.get("stateMutability").and_then(Value::as_str) {
                Some("view") => StateMutability::View,
                Some("pure") => StateMutability::Pure,
                Some("payable") => StateMutability::Payable,
                _ => {
                    if value.get("payable").and_then(Value::as_bool).unwrap_or(false) {
                        StateMutability::Payable
                    } else {
                        StateMutability::Nonpayable
                    }
                }
            }
        };
        match kind {
            "function" => Ok(Fragment::Function {
                name: name(),
                inputs: parse_params("inputs", false)?,
                outputs: parse_params("outputs", false)?,
                state_mutability: state_mutability(),
            }),
            "event" => Ok(Fragment::Event {
                name: name(),
                inputs: parse_params("inputs", true)?,
                anonymous: value.get("anonymous").and_then(Value::as_bool).unwrap_or(false),
            }),
            "constructor" => Ok(Fragment::Constructor {
                inputs: parse_params("inputs", false)?,
                state_mutability: state_mutability(),
            }),
            "error" => Ok(Fragment::Error { name: name(), inputs: parse_params("inputs", false)? }),
            "receive" => Ok(Fragment::Receive),
            "fallback" => Ok(Fragment::Fallback { state_mutability: state_mutability() }),
            other => Err(AbiError::ParseError(format!("unknown fragment type: {other}"))),
        }
    }

    /// Renders the terse human-readable form, e.g.
    /// `function transfer(address to, uint256 amount) returns (bool)`.
    pub fn to_human(&self) -> String {
        let params = |ps: &[Param]| ps.iter().map(Param::human).collect::<Vec<_>>().join(", ");
        match self {
            Fragment::Function { name, inputs, outputs, state_mutability } => {
                let mutability = match state_mutability {
                    StateMutability::Nonpayable => String::new(),
                    m => format!(" {}", m.as_str()),
                };
                let ret = if outputs.is_empty() {
                    String::new()
                } else {
                    format!(" returns ({})", params(outputs))
                };
                format!("function {name}({}){mutability}{ret}", params(inputs))
            }
            Fragment::Event { name, inputs, anonymous } => {
                let anon = if *anonymous { " anonymous" } else { "" };
                format!("event {name}({}){anon}", params(inputs))
            }
            Fragment::Constructor { inputs, state_mutability } => {
                let mutability = match state_mutability {
                    StateMutability::Nonpayable => String::new(),
                    m => format!(" {}", m.as_str()),
                };
                format!("constructor({}){mutability}", params(inputs))
            }
            Fragment::Error { name, inputs } => format!("error {name}({})", params(inputs)),
            Fragment::Receive => "receive() external payable".to_string(),
            Fragment::Fallback { state_mutability } => {
                format!("fallback() external {}", state_mutability.as_str())
            }
        }
    }

    /// Renders one entry of a JSON ABI array.
    pub fn to_json(&self) -> Value {
        match self {
            Fragment::Function { name, inputs, outputs, state_mutability } => serde_json::json!({
                "type": "function",
                "name": name,
                "inputs": inputs.iter().map(|p| p.to_json(false)).collect::<Vec<_>>(),
                "outputs": outputs.iter().map(|p| p.to_json(false)).collect::<Vec<_>>(),
                "stateMutability": state_mutability.as_str(),
            }),
            Fragment::Event { name, inputs, anonymous } => serde_json::json!({
                "type": "event",
                "name": name,
                "inputs": inputs.iter().map(|p| p.to_json(true)).collect::<Vec<_>>(),
                "anonymous": anonymous,
            }),
            Fragment::Constructor { inputs, state_mutability } => serde_json::json!({
                "type": "constructor",
                "inputs": inputs.iter().map(|p| p.to_json(false)).collect::<Vec<_>>(),
                "stateMutability": state_mutability.as_str(),
            }),
            Fragment::Error { name, inputs } => serde_json::json!({
                "type": "error",
                "name": name,
                "inputs": inputs.iter().map(|p| p.to_json(false)).collect::<Vec<_>>(),
            }),
            Fragment::Receive => serde_json::json!({"type": "receive", "stateMutability": "payable"}),
            Fragment::Fallback { state_mutability } => serde_json::json!({
                "type": "fallback",
                "stateMutability": state_mutability.as_str(),
            }),
        }
    }

    /// The canonical signature `name(t1,t2,...)` — names, `indexed`, and
    /// storage-location words never appear; selectors and topics are
    /// computed over this form only.
    pub fn canonical_signature(&self) -> Option<String> {
        let name = self.name()?;
        let types: Vec<String> = self.inputs().iter().map(|p| p.ty.canonical()).collect();
        Some(format!("{name}({})", types.join(",")))
    }

    /// First 4 bytes of keccak256(canonical signature); functions and
    /// errors only.
    pub fn selector(&self) -> Option<[u8; 4]> {
        match self {
            Fragment::Function { .. } | Fragment::Error { .. } => {
                let sig = self.canonical_signature()?;
                let hash = keccak256(sig.as_bytes());
                let mut out = [0u8; 4];
                out.copy_from_slice(&hash[..4]);
                Some(out)
            }
            _ => None,
        }
    }

    /// Full 32-byte keccak256(canonical signature); events only (`topic0`).
    pub fn topic(&self) -> Option<B256> {
        match self {
            Fragment::Event { .. } => {
                let sig = self.canonical_signature()?;
                Some(keccak256(sig.as_bytes()))
            }
            _ => None,
        }
    }
}

/// `id(signature) -> 4-byte selector`: the first 4 bytes of
/// keccak256(signature).
pub fn id(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_selector() {
        let sel = id("transfer(address,uint256)");
        assert_eq!(::hex::encode(sel), "a9059cbb");
    }

    #[test]
    fn balance_of_selector() {
        assert_eq!(::hex::encode(id("balanceOf(address)")), "70a08231");
    }

    #[test]
    fn transfer_event_topic() {
        let topic = keccak256(b"Transfer(address,address,uint256)");
        assert_eq!(
            ::hex::encode(topic),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn canonical_signature_ignores_names_and_indexed() {
        let f = Fragment::Function {
            name: "transfer".to_string(),
            inputs: vec![
                Param::new("to", ParamType::Address),
                Param::new("amount", ParamType::Uint(256)),
            ],
            outputs: vec![Param::new("", ParamType::Bool)],
            state_mutability: StateMutability::Nonpayable,
        };
        assert_eq!(f.canonical_signature().unwrap(), "transfer(address,uint256)");
        assert_eq!(::hex::encode(f.selector().unwrap()), "a9059cbb");
    }
}

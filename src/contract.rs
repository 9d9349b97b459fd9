//! Contract facade: a deployed contract bound to an interface and transport.

use std::sync::Arc;

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use serde_json::{json, Value};

use crate::abi::{Interface, StateMutability};
use crate::account::Account;
use crate::error::{Error, ErrorKind};
use crate::hex;
use crate::rlp::{encode_list, Encodable};
use crate::rpc::{BatchRequest, Transport};
use crate::tx::{SignedTransaction, TransactionRequest};

/// A contract instance: an address, its interface, and the transport used
/// to call or send to it.
pub struct Contract {
    address: Address,
    interface: Interface,
    transport: Arc<Transport>,
}

impl Contract {
    pub fn new(address: Address, interface: Interface, transport: Arc<Transport>) -> Self {
        Self { address, interface, transport }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn interface(&self) -> &Interface {
        &self.interface
    }

    /// Returns a bound handle for repeated calls/sends to one function
    /// without re-typing its name.
    pub fn function<'a>(&'a self, name_or_sig: &str) -> Result<ContractFunction<'a>, Error> {
        self.interface.function(name_or_sig)?;
        Ok(ContractFunction { contract: self, name: name_or_sig.to_string() })
    }

    /// `eth_call`s a declared `pure`/`view` function and decodes its return
    /// values. Raises `UNSUPPORTED_OPERATION` for a state-mutating
    /// function; use [`Contract::static_call`] to force a call anyway, or
    /// [`Contract::send`] to actually submit it.
    pub async fn call(&self, name_or_sig: &str, args: &[Value]) -> Result<Vec<Value>, Error> {
        let fragment = self.interface.function(name_or_sig)?;
        match fragment.state_mutability() {
            StateMutability::Pure | StateMutability::View => self.static_call(name_or_sig, args).await,
            _ => Err(Error::new(ErrorKind::UnsupportedOperation)
                .with_message(format!("{name_or_sig} is state-mutating; use send or static_call"))),
        }
    }

    /// `eth_call`s any function regardless of its declared mutability and
    /// decodes its return values, simulating a state-changing call without
    /// submitting it.
    pub async fn static_call(&self, name_or_sig: &str, args: &[Value]) -> Result<Vec<Value>, Error> {
        let data = self.interface.encode_function_data(name_or_sig, args)?;
        let result = self.transport.send("eth_call", json!([self.call_object(&data), "latest"])).await?;
        let bytes = hex::to_bytes(result.as_str().unwrap_or("0x"))?;
        self.interface.decode_function_result(name_or_sig, &bytes)
    }

    /// Builds, signs, and submits a state-changing call via `account`.
    pub async fn send(
        &self,
        name_or_sig: &str,
        args: &[Value],
        account: &Account,
    ) -> Result<SignedTransaction, Error> {
        let data = self.interface.encode_function_data(name_or_sig, args)?;
        let tx = TransactionRequest { to: Some(self.address), data: data.into(), ..Default::default() };
        account.send_transaction(tx).await
    }

    /// `eth_estimateGas`s a call without submitting it. `account`, when
    /// given, supplies the `from` address so gas estimation accounts for
    /// the caller's balance and any `msg.sender`-dependent logic.
    pub async fn estimate_gas(
        &self,
        name_or_sig: &str,
        args: &[Value],
        account: Option<&Account>,
    ) -> Result<U256, Error> {
        let data = self.interface.encode_function_data(name_or_sig, args)?;
        let mut obj = self.call_object(&data);
        if let Some(account) = account {
            obj["from"] = json!(format!("{:#x}", account.address()));
        }
        let result = self.transport.send("eth_estimateGas", json!([obj])).await?;
        hex::from_quantity(result.as_str().unwrap_or("0x0"))
    }

    /// `eth_getLogs`-backed event query: encodes `filter_args` into topics
    /// (`None` entries are wildcards) via [`Interface::encode_event_topics`],
    /// then decodes each returned log with the corresponding event's
    /// non-indexed/indexed layout.
    pub async fn query_filter(
        &self,
        event_name_or_sig: &str,
        filter_args: &[Option<Value>],
        from_block: &str,
        to_block: &str,
    ) -> Result<Vec<Value>, Error> {
        let topics = self.interface.encode_event_topics(event_name_or_sig, filter_args)?;
        let topics_json: Vec<Value> =
            topics.iter().map(|t| t.map(|b| json!(format!("{b:#x}"))).unwrap_or(Value::Null)).collect();
        let filter = json!({
            "address": format!("{:#x}", self.address),
            "topics": topics_json,
            "fromBlock": from_block,
            "toBlock": to_block,
        });
        let logs = self.transport.send("eth_getLogs", json!([filter])).await?;
        let logs = logs
            .as_array()
            .ok_or_else(|| Error::new(ErrorKind::BadData).with_message("eth_getLogs did not return an array"))?;

        let mut out = Vec::with_capacity(logs.len());
        for log in logs {
            let log_topics: Vec<B256> = log
                .get("topics")
                .and_then(Value::as_array)
                .ok_or_else(|| Error::new(ErrorKind::BadData).with_message("log missing topics"))?
                .iter()
                .map(|t| {
                    let s = t
                        .as_str()
                        .ok_or_else(|| Error::new(ErrorKind::BadData).with_message("log topic is not a string"))?;
                    Ok::<B256, Error>(B256::from_slice(&hex::to_bytes(s)?))
                })
                .collect::<Result<Vec<_>, Error>>()?;
            let data = hex::to_bytes(log.get("data").and_then(Value::as_str).unwrap_or("0x"))?;
            let args = self.interface.decode_event_log(event_name_or_sig, &log_topics, &data)?;
            out.push(json!({
                "args": args,
                "blockNumber": log.get("blockNumber"),
                "transactionHash": log.get("transactionHash"),
                "logIndex": log.get("logIndex"),
            }));
        }
        Ok(out)
    }

    /// Composes `calls` into one JSON-RPC batch of `eth_call` entries and
    /// decodes each result with its own function's outputs. A single
    /// call's revert or decode failure doesn't fail the others: each slot
    /// carries its own `Result`, in the same order as `calls`.
    pub async fn multicall(&self, calls: &[(&str, &[Value])]) -> Result<Vec<Result<Vec<Value>, Error>>, Error> {
        let mut batch = BatchRequest::new();
        for (name, args) in calls {
            let data = self.interface.encode_function_data(name, args)?;
            batch.add("eth_call", json!([self.call_object(&data), "latest"]));
        }
        let raw_results = batch.send(&self.transport).await?;

        let mut out = Vec::with_capacity(raw_results.len());
        for ((name, _), result) in calls.iter().zip(raw_results) {
            let decoded = result.and_then(|value| {
                let bytes = hex::to_bytes(value.as_str().unwrap_or("0x"))?;
                self.interface.decode_function_result(name, &bytes)
            });
            out.push(decoded);
        }
        Ok(out)
    }

    fn call_object(&self, data: &[u8]) -> Value {
        json!({"to": format!("{:#x}", self.address), "data": hex::from_bytes(data)})
    }
}

/// A function bound to its contract and name, for call sites that invoke
/// the same function repeatedly.
pub struct ContractFunction<'a> {
    contract: &'a Contract,
    name: String,
}

impl<'a> ContractFunction<'a> {
    pub async fn call(&self, args: &[Value]) -> Result<Vec<Value>, Error> {
        self.contract.call(&self.name, args).await
    }

    pub async fn static_call(&self, args: &[Value]) -> Result<Vec<Value>, Error> {
        self.contract.static_call(&self.name, args).await
    }

    pub async fn send(&self, args: &[Value], account: &Account) -> Result<SignedTransaction, Error> {
        self.contract.send(&self.name, args, account).await
    }

    pub async fn estimate_gas(&self, args: &[Value], account: Option<&Account>) -> Result<U256, Error> {
        self.contract.estimate_gas(&self.name, args, account).await
    }
}

/// Deploys new instances of one bytecode/interface pair.
pub struct ContractFactory {
    interface: Interface,
    bytecode: Bytes,
    transport: Arc<Transport>,
}

impl ContractFactory {
    pub fn new(interface: Interface, bytecode: Bytes, transport: Arc<Transport>) -> Self {
        Self { interface, bytecode, transport }
    }

    /// Deploys the contract, returning the signed deployment transaction and
    /// the deterministic address it will be created at.
    pub async fn deploy(&self, args: &[Value], account: &Account) -> Result<(SignedTransaction, Address), Error> {
        let data = self.interface.encode_deploy(&self.bytecode, args)?;
        // Pin the nonce before submitting so the address we derive here
        // matches the one send_transaction actually signs with.
        let nonce = account.get_nonce().await?;
        let tx = TransactionRequest { to: None, data: data.into(), nonce: Some(nonce), ..Default::default() };
        let signed = account.send_transaction(tx).await?;
        let address = contract_create_address(account.address(), nonce);
        Ok((signed, address))
    }

    pub fn connect(&self, address: Address) -> Contract {
        Contract::new(address, self.interface.clone(), self.transport.clone())
    }
}

/// The deterministic `CREATE` contract address: the low 20 bytes of
/// `keccak256(rlp([sender, nonce]))`.
pub fn contract_create_address(sender: Address, nonce: U256) -> Address {
    let encoded = encode_list(&[sender.rlp_encode(), nonce.rlp_encode()]);
    let hash = keccak256(encoded);
    Address::from_slice(&hash[12..32])
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn create_address_is_deterministic_and_nonce_sensitive() {
        let sender = address!("1234567890123456789012345678901234567890");
        let a0 = contract_create_address(sender, U256::ZERO);
        let a1 = contract_create_address(sender, U256::from(1u64));
        assert_ne!(a0, a1);
        assert_eq!(a0, contract_create_address(sender, U256::ZERO));
    }
}

//! The key holder: a private key plus, once bound to a transport, the
//! ability to query chain state and submit transactions.
//!
//! An `Account` always knows its address; it can only talk to a chain once
//! [`Account::bind`] attaches a [`Transport`]. Every network-touching method
//! raises `UNSUPPORTED_OPERATION` on an unbound account rather than
//! panicking or silently no-opping.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use serde_json::{json, Value};

use crate::error::{Error, ErrorKind};
use crate::hex;
use crate::rpc::Transport;
use crate::tx::{sign_eip1559, sign_legacy, RawSignature, Signer, SignedTransaction, TransactionRequest};

/// The default `maxPriorityFeePerGas` tip used when a caller doesn't supply
/// one on an EIP-1559-capable chain: 1.5 gwei.
fn default_priority_fee() -> U256 {
    U256::from(1_500_000_000u64)
}

/// A private key plus, once bound, the transport used to fill in and
/// submit transactions.
pub struct Account {
    signer: Signer,
    transport: Option<Arc<Transport>>,
}

impl Account {
    /// Derives an account from a 32-byte secp256k1 private key.
    pub fn from_private_key(private_key: &[u8]) -> Result<Self, Error> {
        Ok(Self { signer: Signer::from_bytes(private_key)?, transport: None })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Attaches a transport, enabling `get_nonce`/`get_balance`/`send_transaction`.
    pub fn bind(&mut self, transport: Arc<Transport>) {
        self.transport = Some(transport);
    }

    pub fn is_bound(&self) -> bool {
        self.transport.is_some()
    }

    fn transport(&self) -> Result<&Transport, Error> {
        self.transport.as_deref().ok_or_else(|| {
            Error::new(ErrorKind::UnsupportedOperation).with_message("account is not bound to a transport")
        })
    }

    pub async fn get_nonce(&self) -> Result<U256, Error> {
        let transport = self.transport()?;
        let result = transport
            .send("eth_getTransactionCount", json!([format!("{:#x}", self.address()), "pending"]))
            .await?;
        hex::from_quantity(result.as_str().unwrap_or("0x0"))
    }

    pub async fn get_balance(&self) -> Result<U256, Error> {
        let transport = self.transport()?;
        let result = transport.send("eth_getBalance", json!([format!("{:#x}", self.address()), "latest"])).await?;
        hex::from_quantity(result.as_str().unwrap_or("0x0"))
    }

    /// Signs a message per `personal_sign`.
    pub fn sign_message(&self, message: &[u8]) -> Result<(RawSignature, u8), Error> {
        self.signer.sign_message(message).map_err(Error::from)
    }

    /// Fills in whatever `tx` leaves unset, signs it, and submits it.
    ///
    /// The auto-fill order is: chain id, nonce, fee fields, gas limit, then
    /// signing and submission. Any field the caller already set is left
    /// untouched. When the caller leaves every fee field unset, the latest
    /// block's `baseFeePerGas` decides the envelope: present means the
    /// chain supports EIP-1559 and an EIP-1559 fee pair is filled in;
    /// absent means legacy `gas_price` is filled in instead.
    pub async fn send_transaction(&self, mut tx: TransactionRequest) -> Result<SignedTransaction, Error> {
        let transport = self.transport()?;

        if tx.chain_id.is_none() {
            tx.chain_id = Some(u256_to_u64(transport.chain_id().await?));
        }
        if tx.nonce.is_none() {
            tx.nonce = Some(self.get_nonce().await?);
        }

        if tx.max_fee_per_gas.is_none() && tx.max_priority_fee_per_gas.is_none() && tx.gas_price.is_none() {
            match self.latest_base_fee(transport).await? {
                Some(base_fee) => {
                    let tip = default_priority_fee();
                    tx.max_priority_fee_per_gas = Some(tip);
                    tx.max_fee_per_gas = Some(base_fee * U256::from(2u8) + tip);
                }
                None => {
                    let price = transport.send("eth_gasPrice", json!([])).await?;
                    tx.gas_price = Some(hex::from_quantity(price.as_str().unwrap_or("0x0"))?);
                }
            }
        } else if tx.is_eip1559() {
            if tx.max_priority_fee_per_gas.is_none() {
                tx.max_priority_fee_per_gas = Some(default_priority_fee());
            }
            if tx.max_fee_per_gas.is_none() {
                let base_fee = self.latest_base_fee(transport).await?.unwrap_or(U256::ZERO);
                let tip = tx.max_priority_fee_per_gas.expect("just filled above");
                tx.max_fee_per_gas = Some(base_fee * U256::from(2u8) + tip);
            }
        }

        if tx.gas_limit.is_none() {
            let estimate = transport.send("eth_estimateGas", json!([self.call_object(&tx)])).await?;
            tx.gas_limit = Some(hex::from_quantity(estimate.as_str().unwrap_or("0x5208"))?);
        }

        let signed = if tx.is_eip1559() { sign_eip1559(&tx, &self.signer)? } else { sign_legacy(&tx, &self.signer)? };

        transport.send("eth_sendRawTransaction", json!([hex::from_bytes(&signed.raw)])).await?;
        Ok(signed)
    }

    /// The latest block's `baseFeePerGas`, or `None` if the chain doesn't
    /// report one (a pre-EIP-1559 chain).
    async fn latest_base_fee(&self, transport: &Transport) -> Result<Option<U256>, Error> {
        let block = transport.send("eth_getBlockByNumber", json!(["latest", false])).await?;
        match block.get("baseFeePerGas").and_then(Value::as_str) {
            Some(s) => Ok(Some(hex::from_quantity(s)?)),
            None => Ok(None),
        }
    }

    fn call_object(&self, tx: &TransactionRequest) -> Value {
        let mut obj = json!({
            "from": format!("{:#x}", self.address()),
            "value": hex::to_quantity(tx.value),
            "data": hex::from_bytes(&tx.data),
        });
        if let Some(to) = tx.to {
            obj["to"] = json!(format!("{to:#x}"));
        }
        obj
    }
}

fn u256_to_u64(n: U256) -> u64 {
    let bytes = n.to_be_bytes::<32>();
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[24..32]);
    u64::from_be_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A fixed test private key; only its resulting address matters here.
    const TEST_KEY: [u8; 32] = [
        0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23,
        0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23,
    ];

    #[test]
    fn unbound_account_still_derives_address() {
        let account = Account::from_private_key(&TEST_KEY).unwrap();
        assert!(!account.is_bound());
        assert_ne!(account.address(), Address::ZERO);
    }

    #[tokio::test]
    async fn unbound_get_nonce_is_unsupported_operation() {
        let account = Account::from_private_key(&TEST_KEY).unwrap();
        let err = account.get_nonce().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedOperation);
    }

    #[test]
    fn u256_to_u64_roundtrips() {
        assert_eq!(u256_to_u64(U256::from(12345u64)), 12345);
    }

    /// An in-process HTTP server whose response depends on which JSON-RPC
    /// method the request names, so a single bound account can exercise a
    /// realistic multi-call `send_transaction` flow in one test.
    async fn dispatch_server(routes: &'static [(&'static str, &'static str)]) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(s) => s,
                    Err(_) => return,
                };
                let mut buf = [0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let body = routes
                    .iter()
                    .find(|(method, _)| request.contains(method))
                    .map(|(_, body)| *body)
                    .unwrap_or(r#"{"jsonrpc":"2.0","id":1,"result":"0x0"}"#);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    const CHAIN_AND_NONCE_ROUTES: &[(&str, &str)] = &[
        ("eth_chainId", r#"{"jsonrpc":"2.0","id":1,"result":"0x1"}"#),
        ("eth_getTransactionCount", r#"{"jsonrpc":"2.0","id":1,"result":"0x0"}"#),
        ("eth_estimateGas", r#"{"jsonrpc":"2.0","id":1,"result":"0x5208"}"#),
        ("eth_sendRawTransaction", r#"{"jsonrpc":"2.0","id":1,"result":"0xabc"}"#),
    ];

    #[tokio::test]
    async fn send_transaction_picks_eip1559_when_base_fee_present() {
        let mut routes = CHAIN_AND_NONCE_ROUTES.to_vec();
        routes.push((
            "eth_getBlockByNumber",
            r#"{"jsonrpc":"2.0","id":1,"result":{"baseFeePerGas":"0x3b9aca00"}}"#,
        ));
        let routes: &'static [(&str, &str)] = Box::leak(routes.into_boxed_slice());
        let url = dispatch_server(routes).await;
        let mut account = Account::from_private_key(&TEST_KEY).unwrap();
        account.bind(Arc::new(Transport::new(url)));
        let signed = account.send_transaction(TransactionRequest::default()).await.unwrap();
        assert!(!signed.raw.is_empty());
        assert_eq!(signed.raw[0], 0x02, "base fee present should pick the EIP-1559 envelope");
    }

    #[tokio::test]
    async fn send_transaction_picks_legacy_when_base_fee_absent() {
        let mut routes = CHAIN_AND_NONCE_ROUTES.to_vec();
        routes.push(("eth_getBlockByNumber", r#"{"jsonrpc":"2.0","id":1,"result":{}}"#));
        routes.push(("eth_gasPrice", r#"{"jsonrpc":"2.0","id":1,"result":"0x3b9aca00"}"#));
        let routes: &'static [(&str, &str)] = Box::leak(routes.into_boxed_slice());
        let url = dispatch_server(routes).await;
        let mut account = Account::from_private_key(&TEST_KEY).unwrap();
        account.bind(Arc::new(Transport::new(url)));
        let signed = account.send_transaction(TransactionRequest::default()).await.unwrap();
        assert!(!signed.raw.is_empty());
        assert_ne!(signed.raw[0], 0x02, "missing base fee should pick the legacy envelope");
    }
}

//! JSON-RPC transport: single and batch dispatch, chain id caching, and
//! transaction-receipt polling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{B256, U256};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use super::error::{classify, RpcErrorObject};
use crate::error::{Error, ErrorKind};
use crate::hex;

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// A JSON-RPC transport bound to one endpoint. Cheap to construct; holds no
/// interior mutability beyond an id counter and a once-initialized chain id
/// cache, so it is `Send + Sync` and safe to share behind an `Arc`.
pub struct Transport {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
    chain_id: OnceCell<U256>,
}

impl Transport {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self { client, url: url.into(), next_id: AtomicU64::new(1), chain_id: OnceCell::new() }
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn network_error(err: reqwest::Error) -> Error {
        Error::new(ErrorKind::NetworkError).with_message(err.to_string())
    }

    /// Dispatches a single JSON-RPC call and returns its `result`.
    pub async fn send(&self, method: &str, params: Value) -> Result<Value, Error> {
        let id = self.allocate_id();
        let body = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        tracing::trace!(method, id, "dispatching JSON-RPC call");
        let resp = self.client.post(&self.url).json(&body).send().await.map_err(Self::network_error)?;
        let parsed: RpcResponse = resp.json().await.map_err(Self::network_error)?;
        if let Some(err) = parsed.error {
            return Err(classify(&RpcErrorObject { code: err.code, message: err.message, data: err.data }));
        }
        parsed.result.ok_or_else(|| Error::new(ErrorKind::BadData).with_message("JSON-RPC response missing result"))
    }

    /// Dispatches a batch of calls in one HTTP round trip. Results come back
    /// in the same order as `calls`, regardless of what order the server
    /// wrote its responses in — each response's echoed `id` is matched back
    /// to the request that generated it.
    pub async fn send_batch(&self, calls: &[(String, Value)]) -> Result<Vec<Result<Value, Error>>, Error> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::with_capacity(calls.len());
        let mut batch = Vec::with_capacity(calls.len());
        for (method, params) in calls {
            let id = self.allocate_id();
            ids.push(id);
            batch.push(json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}));
        }
        tracing::trace!(count = calls.len(), "dispatching JSON-RPC batch");
        let resp = self.client.post(&self.url).json(&batch).send().await.map_err(Self::network_error)?;
        let parsed: Vec<RpcResponse> = resp.json().await.map_err(Self::network_error)?;
        let mut by_id: HashMap<u64, RpcResponse> =
            parsed.into_iter().filter_map(|r| r.id.map(|id| (id, r))).collect();

        Ok(ids
            .into_iter()
            .map(|id| match by_id.remove(&id) {
                Some(RpcResponse { error: Some(err), .. }) => {
                    Err(classify(&RpcErrorObject { code: err.code, message: err.message, data: err.data }))
                }
                Some(RpcResponse { result: Some(result), .. }) => Ok(result),
                Some(_) => Err(Error::new(ErrorKind::BadData).with_message("batch entry has neither result nor error")),
                None => Err(Error::new(ErrorKind::BadData).with_message("batch response missing matching id")),
            })
            .collect())
    }

    /// The chain id, fetched via `eth_chainId` once and cached thereafter.
    pub async fn chain_id(&self) -> Result<U256, Error> {
        let cached = self
            .chain_id
            .get_or_try_init(|| async {
                let result = self.send("eth_chainId", json!([])).await?;
                let s = result
                    .as_str()
                    .ok_or_else(|| Error::new(ErrorKind::BadData).with_message("eth_chainId did not return a string"))?;
                hex::from_quantity(s)
            })
            .await?;
        Ok(*cached)
    }

    /// Polls `eth_getTransactionReceipt` until the transaction has at least
    /// `confirmations` confirmations or `timeout` elapses.
    pub async fn wait_for_transaction(
        &self,
        hash: B256,
        confirmations: u64,
        timeout: Duration,
    ) -> Result<Value, Error> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let receipt = self.send("eth_getTransactionReceipt", json!([format!("{hash:#x}")])).await?;
            if !receipt.is_null() {
                if confirmations <= 1 {
                    return Ok(receipt);
                }
                let block_hex = receipt
                    .get("blockNumber")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::new(ErrorKind::BadData).with_message("receipt missing blockNumber"))?;
                let receipt_block = hex::from_quantity(block_hex)?;
                let latest = self.send("eth_blockNumber", json!([])).await?;
                let latest_block = hex::from_quantity(latest.as_str().unwrap_or("0x0"))?;
                if latest_block >= receipt_block + U256::from(confirmations - 1) {
                    return Ok(receipt);
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::new(ErrorKind::Timeout).with_message("timed out waiting for transaction"));
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Spawns an in-process HTTP server that always returns `body` for every
    /// request, so transport tests carry no network dependency.
    async fn mock_server(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(s) => s,
                    Err(_) => return,
                };
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
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

    #[tokio::test]
    async fn send_returns_result() {
        let url = mock_server(r#"{"jsonrpc":"2.0","id":1,"result":"0x1"}"#).await;
        let transport = Transport::new(url);
        let result = transport.send("eth_chainId", json!([])).await.unwrap();
        assert_eq!(result, json!("0x1"));
    }

    #[tokio::test]
    async fn send_classifies_error() {
        let url = mock_server(r#"{"jsonrpc":"2.0","id":1,"error":{"code":3,"message":"execution reverted"}}"#).await;
        let transport = Transport::new(url);
        let err = transport.send("eth_call", json!([])).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::CallException);
    }

    #[tokio::test]
    async fn batch_results_preserve_request_order_despite_reordered_response() {
        // ids 1 and 2 are allocated for this batch; the server echoes them
        // back in reverse order, which send_batch must undo.
        let url = mock_server(
            r#"[{"jsonrpc":"2.0","id":2,"result":"second"},{"jsonrpc":"2.0","id":1,"result":"first"}]"#,
        )
        .await;
        let transport = Transport::new(url);
        let results = transport
            .send_batch(&[("m1".to_string(), json!([])), ("m2".to_string(), json!([]))])
            .await
            .unwrap();
        assert_eq!(results[0].as_ref().unwrap(), &json!("first"));
        assert_eq!(results[1].as_ref().unwrap(), &json!("second"));
    }

    /// Spawns an in-process HTTP server that returns `receipt_body` for
    /// every `eth_getTransactionReceipt` call and cycles through
    /// `block_number_responses` (repeating the last entry once exhausted)
    /// for every `eth_blockNumber` call.
    async fn mock_confirmations_server(
        receipt_body: &'static str,
        block_number_responses: &'static [&'static str],
    ) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let counter = std::sync::Arc::new(AtomicU64::new(0));
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(s) => s,
                    Err(_) => return,
                };
                let mut buf = [0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let body = if request.contains("eth_getTransactionReceipt") {
                    receipt_body
                } else {
                    let i = counter.fetch_add(1, Ordering::SeqCst) as usize;
                    block_number_responses[i.min(block_number_responses.len() - 1)]
                };
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

    #[tokio::test]
    async fn wait_for_transaction_requires_enough_confirmations() {
        // Receipt mines at block 1; two confirmations means the function
        // must not return until the latest block reaches 2. The first
        // eth_blockNumber poll still reports 1 (not enough), the second
        // reports 2, so this exercises the "poll again" path.
        let url = mock_confirmations_server(
            r#"{"jsonrpc":"2.0","id":1,"result":{"blockNumber":"0x1"}}"#,
            &[r#"{"jsonrpc":"2.0","id":1,"result":"0x1"}"#, r#"{"jsonrpc":"2.0","id":1,"result":"0x2"}"#],
        )
        .await;
        let transport = Transport::new(url);
        let receipt = transport
            .wait_for_transaction(B256::ZERO, 2, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(receipt.get("blockNumber").unwrap(), "0x1");
    }

    #[tokio::test]
    async fn chain_id_is_cached() {
        let url = mock_server(r#"{"jsonrpc":"2.0","id":1,"result":"0x5"}"#).await;
        let transport = Transport::new(url);
        let first = transport.chain_id().await.unwrap();
        let second = transport.chain_id().await.unwrap();
        assert_eq!(first, U256::from(5u64));
        assert_eq!(first, second);
    }
}

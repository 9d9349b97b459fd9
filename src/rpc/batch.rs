//! A batch of JSON-RPC calls accumulated before dispatch.
//!
//! Accumulates calls before dispatch so a caller can build up a batch across
//! several call sites, then fire it in one round trip and index back into
//! the results by the handle each `add` returned.

use serde_json::Value;

use super::transport::Transport;
use crate::error::Error;

/// A handle returned by [`BatchRequest::add`]; its position in the batch.
pub type CallHandle = usize;

#[derive(Debug, Default)]
pub struct BatchRequest {
    calls: Vec<(String, Value)>,
}

impl BatchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a call, returning the handle to fetch its result with after
    /// [`BatchRequest::send`].
    pub fn add(&mut self, method: impl Into<String>, params: Value) -> CallHandle {
        self.calls.push((method.into(), params));
        self.calls.len() - 1
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Dispatches every queued call in one HTTP round trip. The returned
    /// vector is indexed by [`CallHandle`], independent of what order the
    /// server wrote its responses in.
    pub async fn send(self, transport: &Transport) -> Result<Vec<Result<Value, Error>>, Error> {
        transport.send_batch(&self.calls).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_returns_sequential_handles() {
        let mut batch = BatchRequest::new();
        let h0 = batch.add("eth_chainId", serde_json::json!([]));
        let h1 = batch.add("eth_blockNumber", serde_json::json!([]));
        assert_eq!(h0, 0);
        assert_eq!(h1, 1);
        assert_eq!(batch.len(), 2);
    }
}

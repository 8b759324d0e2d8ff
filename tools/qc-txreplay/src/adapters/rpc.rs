//! JSON-RPC client for the node the transactions are resubmitted to.
//!
//! Wire format:
//!
//! ```text
//! request:  {"jsonrpc":"2.0","id":"cli","method":"<m>","params":[...]}
//! response: {"error":<i64>,"desc":"<text>","result":<any>}
//! ```
//!
//! A non-zero `error` is a remote failure. No request is ever retried.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::hash_to_hex;

use crate::config::RpcConfig;
use crate::error::RpcError;
use crate::ports::{BlockRef, RemoteSubmitter};

const JSON_RPC_VERSION: &str = "2.0";
const REQUEST_ID: &str = "cli";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    error: i64,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    result: Value,
}

/// Node JSON-RPC client.
pub struct JsonRpcClient {
    client: Client,
    endpoint: String,
}

impl JsonRpcClient {
    /// Create a client for the endpoint in `config`.
    pub fn new(config: &RpcConfig) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(RpcError::Http)?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
        })
    }

    /// Endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call a JSON-RPC method and return its `result`.
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: JSON_RPC_VERSION,
            id: REQUEST_ID,
            method,
            params,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RpcError::Connection(format!("Cannot connect to {}", self.endpoint))
                } else {
                    RpcError::Http(e)
                }
            })?;

        let body = response.bytes().await?;
        decode_response(&body)
    }
}

/// Parse a response body, mapping a non-zero error code to [`RpcError::Remote`].
pub fn decode_response(body: &[u8]) -> Result<Value, RpcError> {
    let response: JsonRpcResponse = serde_json::from_slice(body).map_err(|e| {
        RpcError::Parse(format!(
            "{e} (body: {})",
            String::from_utf8_lossy(&body[..body.len().min(256)])
        ))
    })?;
    if response.error != 0 {
        return Err(RpcError::Remote {
            code: response.error,
            desc: response.desc,
        });
    }
    Ok(response.result)
}

fn decode_count(result: Value) -> Result<u32, RpcError> {
    serde_json::from_value(result).map_err(|e| RpcError::Parse(format!("block count: {e}")))
}

fn decode_block(result: Value) -> Result<Vec<u8>, RpcError> {
    let hex_str: String =
        serde_json::from_value(result).map_err(|e| RpcError::Parse(format!("block: {e}")))?;
    hex::decode(hex_str).map_err(|e| RpcError::Parse(format!("block hex: {e}")))
}

#[async_trait]
impl RemoteSubmitter for JsonRpcClient {
    async fn count(&self) -> Result<u32, RpcError> {
        decode_count(self.call("getblockcount", vec![]).await?)
    }

    async fn fetch_block(&self, block: BlockRef) -> Result<Vec<u8>, RpcError> {
        let param = match block {
            BlockRef::Height(height) => Value::from(height),
            BlockRef::Hash(hash) => Value::from(hash_to_hex(&hash)),
        };
        decode_block(self.call("getblock", vec![param]).await?)
    }

    async fn submit(&self, raw_tx_hex: &str) -> Result<(), RpcError> {
        self.call("sendrawtransaction", vec![Value::from(raw_tx_hex)])
            .await
            .map(|_| ())
    }
}

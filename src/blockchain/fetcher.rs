use super::events::FilterSpec;
use crate::error::{BridgeError, Result};
use crate::utils::{decode_hex, parse_quantity, to_quantity};
use async_trait::async_trait;
use backoff::ExponentialBackoff;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::OnceCell;

// Upper bound on internal retries before an error reaches the watcher
const DEFAULT_MAX_RETRY_ELAPSED: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// One on-chain log entry as returned by eth_getLogs
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(rename = "blockNumber", deserialize_with = "quantity")]
    pub block_number: u64,
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    #[serde(rename = "logIndex", deserialize_with = "quantity")]
    pub log_index: u64,
    // Set when the log's block was orphaned by a reorg
    #[serde(default)]
    pub removed: bool,
}

fn quantity<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_quantity(&raw).map_err(serde::de::Error::custom)
}

// Inclusive block range plus address and topic-0 filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub from_block: u64,
    pub to_block: u64,
    pub addresses: Vec<String>,
    pub topics: Vec<String>,
}

impl LogQuery {
    pub fn new(from_block: u64, to_block: u64, filter: &FilterSpec) -> Self {
        LogQuery {
            from_block,
            to_block,
            addresses: filter.addresses.clone(),
            topics: filter.topics(),
        }
    }
}

// Chain primitives the watcher needs; every returned error is treated as retryable
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn block_number(&self) -> Result<u64>;
    fn block_confirmations(&self) -> u64;
    async fn filter_logs(&self, query: &LogQuery) -> Result<Vec<RawLog>>;
    async fn chain_id(&self) -> Result<u64>;
    async fn block_timestamp(&self, block_number: u64) -> Result<u64>;
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'a str,
    method: &'a str,
    params: Vec<Value>,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    timestamp: String,
}

// EVM JSON-RPC client with internal exponential-backoff retries
pub struct EvmRpcClient {
    http: reqwest::Client,
    rpc_url: String,
    confirmations: u64,
    max_retry_elapsed: Duration,
    chain_id: OnceCell<u64>,
}

impl EvmRpcClient {
    pub fn new(rpc_url: &str, confirmations: u64) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        info!("Using EVM JSON-RPC endpoint at {}", rpc_url);
        Ok(EvmRpcClient {
            http,
            rpc_url: rpc_url.to_string(),
            confirmations,
            max_retry_elapsed: DEFAULT_MAX_RETRY_ELAPSED,
            chain_id: OnceCell::new(),
        })
    }

    // Bounds the time spent retrying a single call
    pub fn with_max_retry_elapsed(mut self, max_retry_elapsed: Duration) -> Self {
        self.max_retry_elapsed = max_retry_elapsed;
        self
    }

    // Performs a single JSON-RPC request
    async fn call_once<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<Option<T>> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };

        let response: JsonRpcResponse<T> = self
            .http
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(BridgeError::Rpc(format!(
                "{} failed at {}: {} (code: {})",
                method, self.rpc_url, error.message, error.code
            )));
        }

        Ok(response.result)
    }

    // Retries a JSON-RPC request with exponential backoff, treating every error as transient
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<Option<T>> {
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(400),
            max_interval: Duration::from_secs(30),
            max_elapsed_time: Some(self.max_retry_elapsed),
            ..Default::default()
        };

        let op = move || {
            let params = params.clone();
            async move {
                self.call_once(method, params).await.map_err(|e| {
                    debug!("Retrying {} due to error: {}", method, e);
                    backoff::Error::transient(e)
                })
            }
        };

        backoff::future::retry(backoff, op).await
    }

    // Executes a read-only contract call and returns the raw return data
    pub async fn call_contract(&self, to: &str, data: &[u8]) -> Result<Vec<u8>> {
        let params = vec![
            json!({ "to": to, "data": format!("0x{}", hex::encode(data)) }),
            json!("latest"),
        ];
        let result: Option<String> = self.call("eth_call", params).await?;
        decode_hex(&result.unwrap_or_default())
    }
}

#[async_trait]
impl ChainClient for EvmRpcClient {
    async fn block_number(&self) -> Result<u64> {
        let result: Option<String> = self.call("eth_blockNumber", vec![]).await?;
        let raw = result.ok_or_else(|| BridgeError::Rpc("eth_blockNumber returned no result".into()))?;
        parse_quantity(&raw)
    }

    fn block_confirmations(&self) -> u64 {
        self.confirmations
    }

    async fn filter_logs(&self, query: &LogQuery) -> Result<Vec<RawLog>> {
        let filter = json!({
            "fromBlock": to_quantity(query.from_block),
            "toBlock": to_quantity(query.to_block),
            "address": query.addresses,
            "topics": [query.topics],
        });
        let logs: Option<Vec<RawLog>> = self.call("eth_getLogs", vec![filter]).await?;
        Ok(logs.unwrap_or_default())
    }

    // The chain id never changes for an endpoint; cache the first answer
    async fn chain_id(&self) -> Result<u64> {
        let id = self
            .chain_id
            .get_or_try_init(|| async {
                let result: Option<String> = self.call("eth_chainId", vec![]).await?;
                let raw = result.ok_or_else(|| BridgeError::Rpc("eth_chainId returned no result".into()))?;
                parse_quantity(&raw)
            })
            .await?;
        Ok(*id)
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<u64> {
        let params = vec![json!(to_quantity(block_number)), json!(false)];
        let block: Option<BlockHeader> = self.call("eth_getBlockByNumber", params).await?;
        let block = block.ok_or_else(|| BridgeError::NotFound(format!("block {}", block_number)))?;
        parse_quantity(&block.timestamp)
    }
}

use crate::error::{BridgeError, Result};
use std::env;
use std::time::Duration;

// Defaults inherited from the validator's operational settings
pub const DEFAULT_MAX_LOGS_BLOCKS: u64 = 500;
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_CONFIRMATIONS: u64 = 5;
pub const DEFAULT_SETTLEMENT_CHAIN_ID: u64 = 296;

// Configuration for one monitored EVM router contract
#[derive(Clone, Debug)]
pub struct NetworkConfig {
    pub label: String, // Human-readable network label (e.g., "ETHEREUM")
    pub rpc_url: String, // JSON-RPC endpoint of the chain
    pub router_address: String, // Router contract emitting bridge events
    pub start_block: Option<u64>, // Explicit start block, overrides any stored watermark
    pub confirmations: u64, // Blocks behind head considered final
    pub max_logs_blocks: u64, // Maximum block span per eth_getLogs request
    pub polling_interval: Duration, // Sleep between poll iterations
}

// Configuration for the bridge watcher service
#[derive(Clone, Debug)]
pub struct Config {
    pub db_url: String, // Database connection URL
    pub bind_addr: String, // Address for the metrics/REST HTTP server
    pub assets_path: String, // Path of the JSON asset mapping file
    pub validator: bool, // Validator mode: live transfers are dispatched for signing
    pub monitoring_enabled: bool, // Per-transfer Prometheus gauges
    pub settlement_chain_id: u64, // Chain receiving fee-handling transfers
    pub networks: Vec<NetworkConfig>, // One watcher per entry
}

impl Config {
    // Loads configuration from environment variables, with defaults for optional fields
    pub fn from_env() -> Result<Self> {
        let networks = env::var("EVM_NETWORKS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(NetworkConfig::from_env)
            .collect::<Result<Vec<_>>>()?;

        let config = Config {
            // Required: Database connection URL
            db_url: required("DATABASE_URL")?,
            // Optional: HTTP server bind address (defaults to 0.0.0.0:8080)
            bind_addr: env::var("BIND_ADDR").unwrap_or("0.0.0.0:8080".to_string()),
            // Required: Asset mapping file
            assets_path: required("ASSETS_PATH")?,
            // Optional: Validator mode (defaults to true)
            validator: parse_or("VALIDATOR", true)?,
            // Optional: Per-transfer monitoring (defaults to false)
            monitoring_enabled: parse_or("MONITORING_ENABLED", false)?,
            // Optional: Settlement chain id (defaults to 296)
            settlement_chain_id: parse_or("SETTLEMENT_CHAIN_ID", DEFAULT_SETTLEMENT_CHAIN_ID)?,
            networks,
        };

        if config.networks.is_empty() {
            return Err(BridgeError::Config("EVM_NETWORKS must list at least one network".into()));
        }

        Ok(config)
    }
}

impl NetworkConfig {
    // Reads the EVM_<LABEL>_* variables for a single network
    pub fn from_env(label: &str) -> Result<Self> {
        let label = label.to_uppercase();
        let key = |suffix: &str| format!("EVM_{}_{}", label, suffix);

        let start_block = match env::var(key("START_BLOCK")) {
            Ok(v) if !v.trim().is_empty() => Some(v.trim().parse::<u64>().map_err(|e| {
                BridgeError::Config(format!("{} is not a block number: {}", key("START_BLOCK"), e))
            })?),
            _ => None,
        };

        // Zero means "use the default" for both the chunk size and the interval
        let max_logs_blocks = match parse_or(&key("MAX_LOGS_BLOCKS"), 0u64)? {
            0 => DEFAULT_MAX_LOGS_BLOCKS,
            n => n,
        };
        let polling_interval = match parse_or(&key("POLLING_INTERVAL"), 0u64)? {
            0 => DEFAULT_POLLING_INTERVAL,
            secs => Duration::from_secs(secs),
        };

        Ok(NetworkConfig {
            rpc_url: required(&key("RPC_URL"))?,
            router_address: required(&key("ROUTER_ADDRESS"))?,
            start_block,
            confirmations: parse_or(&key("CONFIRMATIONS"), DEFAULT_CONFIRMATIONS)?,
            max_logs_blocks,
            polling_interval,
            label: label.clone(),
        })
    }
}

fn required(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(BridgeError::Config(format!("{} must be set", name))),
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map_err(|e| BridgeError::Config(format!("{} is invalid: {}", name, e))),
        _ => Ok(default),
    }
}

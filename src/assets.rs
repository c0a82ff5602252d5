//! Native/wrapped asset equivalence across chains.
//!
//! Absence of a mapping is an expected outcome (the asset is not bridged for
//! that chain pair) and is reported as `None`, never as an error.

use crate::error::{BridgeError, Result};
use num_bigint::BigUint;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

// Native asset resolved from the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeAsset {
    pub chain_id: u64,
    pub asset: String,
    pub min_amount: BigUint,
}

// Resolution functions consumed by the watcher and the classifier
pub trait AssetRegistry: Send + Sync {
    // Wrapped representation of a native asset on the target chain
    fn native_to_wrapped(&self, native_asset: &str, native_chain: u64, target_chain: u64) -> Option<String>;

    // Native asset behind a wrapped token living on `wrapped_chain`
    fn wrapped_to_native(&self, wrapped_asset: &str, wrapped_chain: u64) -> Option<NativeAsset>;

    // Native asset entry when `asset` is native on `chain`
    fn fungible_native_asset(&self, chain: u64, asset: &str) -> Option<NativeAsset>;

    // Counterpart on `source_chain` of an asset living on `target_chain`
    fn opposite_asset(&self, source_chain: u64, target_chain: u64, asset: &str) -> Option<String>;

    // Converts an amount from the asset's precision on the source chain to its
    // counterpart's precision on the target chain
    fn adjust_decimals(&self, amount: &BigUint, asset: &str, source_chain: u64, target_chain: u64) -> Result<BigUint>;
}

// On-disk asset mapping file
#[derive(Debug, Deserialize, Default)]
pub struct AssetsConfig {
    pub networks: HashMap<u64, NetworkAssets>,
}

#[derive(Debug, Deserialize, Default)]
pub struct NetworkAssets {
    #[serde(default)]
    pub tokens: HashMap<String, NativeTokenConfig>,
}

#[derive(Debug, Deserialize)]
pub struct NativeTokenConfig {
    pub decimals: u8,
    #[serde(default = "zero_amount")]
    pub min_amount: String,
    #[serde(default)]
    pub networks: HashMap<u64, WrappedTokenConfig>,
}

#[derive(Debug, Deserialize)]
pub struct WrappedTokenConfig {
    pub asset: String,
    pub decimals: u8,
}

fn zero_amount() -> String {
    "0".to_string()
}

// EVM addresses are case-insensitive; other identifiers are kept as-is
fn key(chain: u64, asset: &str) -> (u64, String) {
    if asset.starts_with("0x") {
        (chain, asset.to_lowercase())
    } else {
        (chain, asset.to_string())
    }
}

// In-memory registry built from the asset mapping file
#[derive(Debug, Default)]
pub struct AssetMappings {
    // (native chain, native asset) -> target chain -> wrapped asset
    native_to_wrapped: HashMap<(u64, String), HashMap<u64, String>>,
    // (wrapped chain, wrapped asset) -> native asset
    wrapped_to_native: HashMap<(u64, String), NativeAsset>,
    // (native chain, native asset) -> native asset
    natives: HashMap<(u64, String), NativeAsset>,
    // (chain, asset) -> token decimals on that chain
    decimals: HashMap<(u64, String), u8>,
}

impl AssetMappings {
    // Builds the lookup indices from a parsed mapping file
    pub fn new(config: AssetsConfig) -> Result<Self> {
        let mut mappings = AssetMappings::default();

        for (native_chain, network) in config.networks {
            for (native_asset, token) in network.tokens {
                let min_amount = BigUint::from_str(&token.min_amount).map_err(|e| {
                    BridgeError::Config(format!(
                        "invalid min_amount [{}] for [{}]: {}",
                        token.min_amount, native_asset, e
                    ))
                })?;
                let native = NativeAsset {
                    chain_id: native_chain,
                    asset: native_asset.clone(),
                    min_amount,
                };

                let native_key = key(native_chain, &native_asset);
                mappings.decimals.insert(native_key.clone(), token.decimals);
                mappings.natives.insert(native_key.clone(), native.clone());

                let mut wrapped_by_chain = HashMap::new();
                for (wrapped_chain, wrapped) in token.networks {
                    let wrapped_key = key(wrapped_chain, &wrapped.asset);
                    mappings.decimals.insert(wrapped_key.clone(), wrapped.decimals);
                    mappings.wrapped_to_native.insert(wrapped_key, native.clone());
                    wrapped_by_chain.insert(wrapped_chain, wrapped.asset);
                }
                mappings.native_to_wrapped.insert(native_key, wrapped_by_chain);
            }
        }

        Ok(mappings)
    }

    // Loads and indexes the JSON mapping file at `path`
    pub fn from_file(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("cannot read assets file [{}]: {}", path, e)))?;
        let config: AssetsConfig = serde_json::from_str(&raw)?;
        Self::new(config)
    }

    // Representation on `to_chain` of an asset living on `from_chain`
    fn counterpart(&self, asset: &str, from_chain: u64, to_chain: u64) -> Option<String> {
        if from_chain == to_chain {
            return Some(asset.to_string());
        }
        if self.natives.contains_key(&key(from_chain, asset)) {
            return self.native_to_wrapped(asset, from_chain, to_chain);
        }
        let native = self.wrapped_to_native(asset, from_chain)?;
        if native.chain_id == to_chain {
            Some(native.asset)
        } else {
            self.native_to_wrapped(&native.asset, native.chain_id, to_chain)
        }
    }
}

impl AssetRegistry for AssetMappings {
    fn native_to_wrapped(&self, native_asset: &str, native_chain: u64, target_chain: u64) -> Option<String> {
        self.native_to_wrapped
            .get(&key(native_chain, native_asset))
            .and_then(|by_chain| by_chain.get(&target_chain))
            .cloned()
    }

    fn wrapped_to_native(&self, wrapped_asset: &str, wrapped_chain: u64) -> Option<NativeAsset> {
        self.wrapped_to_native.get(&key(wrapped_chain, wrapped_asset)).cloned()
    }

    fn fungible_native_asset(&self, chain: u64, asset: &str) -> Option<NativeAsset> {
        self.natives.get(&key(chain, asset)).cloned()
    }

    fn opposite_asset(&self, source_chain: u64, target_chain: u64, asset: &str) -> Option<String> {
        self.counterpart(asset, target_chain, source_chain)
    }

    fn adjust_decimals(&self, amount: &BigUint, asset: &str, source_chain: u64, target_chain: u64) -> Result<BigUint> {
        let source_decimals = *self
            .decimals
            .get(&key(source_chain, asset))
            .ok_or_else(|| BridgeError::NotFound(format!("decimals of [{}] on chain [{}]", asset, source_chain)))?;
        let target_asset = self
            .counterpart(asset, source_chain, target_chain)
            .ok_or_else(|| BridgeError::NotFound(format!("[{}] has no representation on chain [{}]", asset, target_chain)))?;
        let target_decimals = *self
            .decimals
            .get(&key(target_chain, &target_asset))
            .ok_or_else(|| BridgeError::NotFound(format!("decimals of [{}] on chain [{}]", target_asset, target_chain)))?;

        Ok(convert_decimals(amount, source_decimals, target_decimals))
    }
}

// Rescales an integer amount between precisions; narrowing truncates
pub fn convert_decimals(amount: &BigUint, from: u8, to: u8) -> BigUint {
    let ten = BigUint::from(10u32);
    if from > to {
        amount / ten.pow(u32::from(from - to))
    } else if to > from {
        amount * ten.pow(u32::from(to - from))
    } else {
        amount.clone()
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use bridgewatch::assets::{AssetMappings, AssetsConfig};
use bridgewatch::blockchain::events::{BURN_SIGNATURE, LOCK_SIGNATURE};
use bridgewatch::blockchain::{ChainClient, LogQuery, MemberRegistry, RawLog, TransferClassifier};
use bridgewatch::error::{BridgeError, Result};
use bridgewatch::metrics::{TransferLabels, TransferMetrics};
use bridgewatch::queue::{Message, Queue};
use bridgewatch::utils::keccak256;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SOURCE_CHAIN: u64 = 1;
pub const EVM_TARGET_CHAIN: u64 = 137;
pub const SETTLEMENT_CHAIN: u64 = 296;

pub const ROUTER: &str = "0x9999999999999999999999999999999999999999";

// Native on the source chain
pub const NATIVE_TOKEN: &str = "0x1111111111111111111111111111111111111111";
pub const NATIVE_TOKEN_ON_EVM: &str = "0x2222222222222222222222222222222222222222";
pub const NATIVE_TOKEN_ON_SETTLEMENT: &str = "0.0.5005";

// Native on the settlement chain, wrapped on the EVM chains
pub const SETTLEMENT_TOKEN: &str = "0.0.7007";
pub const SETTLEMENT_TOKEN_ON_SOURCE: &str = "0x3333333333333333333333333333333333333333";
pub const SETTLEMENT_TOKEN_ON_EVM: &str = "0x4444444444444444444444444444444444444444";

pub const TIMESTAMP_BASE: u64 = 1_700_000_000;

// Asset mapping with the given minimum for every native token
pub fn assets(min_amount: &str) -> Arc<AssetMappings> {
    assets_with_settlement_decimals(min_amount, 18)
}

// Same mapping, with the source-native token held at `decimals` on the settlement chain
pub fn assets_with_settlement_decimals(min_amount: &str, decimals: u8) -> Arc<AssetMappings> {
    let raw = json!({
        "networks": {
            "1": { "tokens": { NATIVE_TOKEN: {
                "decimals": 18,
                "min_amount": min_amount,
                "networks": {
                    "137": { "asset": NATIVE_TOKEN_ON_EVM, "decimals": 18 },
                    "296": { "asset": NATIVE_TOKEN_ON_SETTLEMENT, "decimals": decimals }
                }
            } } },
            "296": { "tokens": { SETTLEMENT_TOKEN: {
                "decimals": 8,
                "min_amount": min_amount,
                "networks": {
                    "1": { "asset": SETTLEMENT_TOKEN_ON_SOURCE, "decimals": 8 },
                    "137": { "asset": SETTLEMENT_TOKEN_ON_EVM, "decimals": 8 }
                }
            } } }
        }
    });
    let config: AssetsConfig = serde_json::from_value(raw).unwrap();
    Arc::new(AssetMappings::new(config).unwrap())
}

// Scripted chain: settable head, a fixed log set and failure switches
pub struct FakeChain {
    chain_id: u64,
    confirmations: u64,
    head: AtomicU64,
    logs: Mutex<Vec<RawLog>>,
    queries: Mutex<Vec<LogQuery>>,
    fail_filter: AtomicBool,
    fail_timestamp: AtomicBool,
    failing_timestamp_blocks: Mutex<Vec<u64>>,
}

impl FakeChain {
    pub fn new(head: u64, confirmations: u64) -> Arc<Self> {
        Arc::new(FakeChain {
            chain_id: SOURCE_CHAIN,
            confirmations,
            head: AtomicU64::new(head),
            logs: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            fail_filter: AtomicBool::new(false),
            fail_timestamp: AtomicBool::new(false),
            failing_timestamp_blocks: Mutex::new(Vec::new()),
        })
    }

    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    pub fn add_log(&self, log: RawLog) {
        self.logs.lock().unwrap().push(log);
    }

    pub fn fail_filter(&self, fail: bool) {
        self.fail_filter.store(fail, Ordering::SeqCst);
    }

    pub fn fail_timestamp(&self, fail: bool) {
        self.fail_timestamp.store(fail, Ordering::SeqCst);
    }

    // Fails timestamp lookups for one block until cleared
    pub fn fail_timestamp_at(&self, block_number: u64) {
        self.failing_timestamp_blocks.lock().unwrap().push(block_number);
    }

    pub fn clear_timestamp_failures(&self) {
        self.failing_timestamp_blocks.lock().unwrap().clear();
    }

    // Inclusive ranges requested so far
    pub fn ranges(&self) -> Vec<(u64, u64)> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .map(|q| (q.from_block, q.to_block))
            .collect()
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn block_number(&self) -> Result<u64> {
        Ok(self.head.load(Ordering::SeqCst))
    }

    fn block_confirmations(&self) -> u64 {
        self.confirmations
    }

    async fn filter_logs(&self, query: &LogQuery) -> Result<Vec<RawLog>> {
        if self.fail_filter.load(Ordering::SeqCst) {
            return Err(BridgeError::Rpc("eth_getLogs unavailable".to_string()));
        }
        self.queries.lock().unwrap().push(query.clone());
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| log.block_number >= query.from_block && log.block_number <= query.to_block)
            .cloned()
            .collect())
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }

    async fn block_timestamp(&self, block_number: u64) -> Result<u64> {
        if self.fail_timestamp.load(Ordering::SeqCst)
            || self.failing_timestamp_blocks.lock().unwrap().contains(&block_number)
        {
            return Err(BridgeError::Rpc("eth_getBlockByNumber unavailable".to_string()));
        }
        Ok(TIMESTAMP_BASE + block_number)
    }
}

#[derive(Default)]
pub struct RecordingQueue {
    messages: Mutex<Vec<Message>>,
}

impl RecordingQueue {
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }
}

impl Queue for RecordingQueue {
    fn push(&self, message: Message) {
        self.messages.lock().unwrap().push(message);
    }
}

// Records every metrics call as (operation, labels)
pub struct RecordingMetrics {
    enabled: bool,
    calls: Mutex<Vec<(&'static str, TransferLabels)>>,
}

impl RecordingMetrics {
    pub fn new(enabled: bool) -> Self {
        RecordingMetrics {
            enabled,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(&'static str, TransferLabels)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &'static str, labels: &TransferLabels) {
        self.calls.lock().unwrap().push((op, labels.clone()));
    }
}

impl TransferMetrics for RecordingMetrics {
    fn is_monitoring_enabled(&self) -> bool {
        self.enabled
    }

    fn create_majority_reached_if_not_exists(&self, labels: &TransferLabels) {
        self.record("majority_reached", labels);
    }

    fn create_fee_transferred_if_not_exists(&self, labels: &TransferLabels) {
        self.record("fee_transferred", labels);
    }

    fn create_user_get_his_tokens_if_not_exists(&self, labels: &TransferLabels) {
        self.record("user_get_his_tokens", labels);
    }

    fn set_user_get_his_tokens(&self, labels: &TransferLabels) {
        self.record("user_get_his_tokens_set", labels);
    }
}

#[derive(Default)]
pub struct CountingMembers {
    reloads: AtomicUsize,
}

impl CountingMembers {
    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MemberRegistry for CountingMembers {
    async fn reload_members(&self) -> Result<()> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn members(&self) -> Vec<String> {
        Vec::new()
    }
}

// Collaborators of one classifier, kept for assertions
pub struct Harness {
    pub chain: Arc<FakeChain>,
    pub queue: Arc<RecordingQueue>,
    pub metrics: Arc<RecordingMetrics>,
    pub members: Arc<CountingMembers>,
}

impl Harness {
    pub fn new(chain: Arc<FakeChain>, monitoring: bool) -> Self {
        Harness {
            chain,
            queue: Arc::new(RecordingQueue::default()),
            metrics: Arc::new(RecordingMetrics::new(monitoring)),
            members: Arc::new(CountingMembers::default()),
        }
    }

    pub fn classifier(&self, min_amount: &str, validator: bool) -> TransferClassifier {
        self.classifier_with_assets(assets(min_amount), validator)
    }

    pub fn classifier_with_assets(&self, assets: Arc<AssetMappings>, validator: bool) -> TransferClassifier {
        TransferClassifier::new(
            self.chain.clone(),
            assets,
            self.members.clone(),
            self.metrics.clone(),
            self.queue.clone(),
            validator,
            SETTLEMENT_CHAIN,
        )
    }
}

// Receiver bytes of settlement account 0.0.1234
pub fn account_id_bytes() -> Vec<u8> {
    vec![0x18, 0xd2, 0x09]
}

pub fn evm_receiver_bytes() -> Vec<u8> {
    hex::decode("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap()
}

pub const EVM_RECEIVER: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

fn uint_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn address_word(address: &str) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&hex::decode(address.trim_start_matches("0x")).unwrap());
    word
}

fn bytes_tail(bytes: &[u8]) -> Vec<u8> {
    let mut tail = uint_word(bytes.len() as u128).to_vec();
    tail.extend_from_slice(bytes);
    tail.resize(32 + bytes.len().div_ceil(32) * 32, 0);
    tail
}

fn raw_log(signature: &str, data: Vec<u8>, block_number: u64, tx_hash: &str, log_index: u64) -> RawLog {
    RawLog {
        address: ROUTER.to_string(),
        topics: vec![format!("0x{}", hex::encode(keccak256(signature.as_bytes())))],
        data: format!("0x{}", hex::encode(data)),
        block_number,
        transaction_hash: tx_hash.to_string(),
        log_index,
        removed: false,
    }
}

// Lock(uint256 targetChain, address token, bytes receiver, uint256 amount, uint256 serviceFee)
pub fn lock_log(block_number: u64, tx_hash: &str, target_chain: u64, receiver: &[u8], amount: u128, fee: u128) -> RawLog {
    let mut data = Vec::new();
    data.extend_from_slice(&uint_word(target_chain as u128));
    data.extend_from_slice(&address_word(NATIVE_TOKEN));
    data.extend_from_slice(&uint_word(5 * 32));
    data.extend_from_slice(&uint_word(amount));
    data.extend_from_slice(&uint_word(fee));
    data.extend(bytes_tail(receiver));
    raw_log(LOCK_SIGNATURE, data, block_number, tx_hash, 0)
}

// Burn(uint256 targetChain, address token, uint256 amount, bytes receiver)
pub fn burn_log(block_number: u64, tx_hash: &str, target_chain: u64, receiver: &[u8], amount: u128) -> RawLog {
    let mut data = Vec::new();
    data.extend_from_slice(&uint_word(target_chain as u128));
    data.extend_from_slice(&address_word(SETTLEMENT_TOKEN_ON_SOURCE));
    data.extend_from_slice(&uint_word(amount));
    data.extend_from_slice(&uint_word(4 * 32));
    data.extend(bytes_tail(receiver));
    raw_log(BURN_SIGNATURE, data, block_number, tx_hash, 0)
}

// Log with a topic the router never emits
pub fn unknown_log(block_number: u64, tx_hash: &str) -> RawLog {
    raw_log("Approval(address,address,uint256)", vec![0u8; 96], block_number, tx_hash, 0)
}

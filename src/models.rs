use serde::{Deserialize, Serialize};

// Canonical cross-chain transfer produced by the classifier and pushed to the queue
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub transaction_id: String,
    pub source_chain_id: u64,
    pub target_chain_id: u64,
    pub native_chain_id: u64,
    pub source_asset: String,
    pub target_asset: String,
    pub native_asset: String,
    pub receiver: String,
    // Decimal string, already in the target chain's precision
    pub amount: String,
    // Source block timestamp, only set for backlog/read-only dispatch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

// Persisted transfer with its independent status tracks
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TransferRecord {
    pub transaction_id: String,
    pub source_chain_id: i64,
    pub target_chain_id: i64,
    pub native_chain_id: i64,
    pub source_asset: String,
    pub target_asset: String,
    pub native_asset: String,
    pub receiver: String,
    pub amount: String,
    pub timestamp: Option<String>,
    pub status: String,
    pub signature_msg_status: Option<String>,
    pub eth_tx_status: Option<String>,
    pub eth_tx_msg_status: Option<String>,
    pub eth_tx_hash: Option<String>,
}

impl TransferRecord {
    // Builds a fresh record for the given transfer with an initial overall status
    pub fn new(transfer: &Transfer, status: &str) -> Self {
        TransferRecord {
            transaction_id: transfer.transaction_id.clone(),
            source_chain_id: transfer.source_chain_id as i64,
            target_chain_id: transfer.target_chain_id as i64,
            native_chain_id: transfer.native_chain_id as i64,
            source_asset: transfer.source_asset.clone(),
            target_asset: transfer.target_asset.clone(),
            native_asset: transfer.native_asset.clone(),
            receiver: transfer.receiver.clone(),
            amount: transfer.amount.clone(),
            timestamp: transfer.timestamp.clone(),
            status: status.to_string(),
            signature_msg_status: None,
            eth_tx_status: None,
            eth_tx_msg_status: None,
            eth_tx_hash: None,
        }
    }
}

// Watermark row, one per watcher identity
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct WatcherStatus {
    pub identity: String,
    pub last_processed_block: i64,
}

// Values stored in the transfer status columns
pub mod status {
    // Status
    pub const INITIAL: &str = "INITIAL";
    pub const RECOVERED: &str = "RECOVERED";
    pub const IN_PROGRESS: &str = "IN_PROGRESS";
    pub const COMPLETED: &str = "COMPLETED";
    pub const FAILED: &str = "FAILED";
    pub const INSUFFICIENT_FEE: &str = "INSUFFICIENT_FEE";

    // SignatureMsgStatus
    pub const SIGNATURE_SUBMITTED: &str = "SIGNATURE_SUBMITTED";
    pub const SIGNATURE_MINED: &str = "SIGNATURE_MINED";
    pub const SIGNATURE_FAILED: &str = "SIGNATURE_FAILED";

    // EthTxStatus
    pub const ETH_TX_SUBMITTED: &str = "ETH_TX_SUBMITTED";
    pub const ETH_TX_MINED: &str = "ETH_TX_MINED";
    pub const ETH_TX_REVERTED: &str = "ETH_TX_REVERTED";

    // EthTxMsgStatus
    pub const ETH_TX_MSG_SUBMITTED: &str = "ETH_TX_MSG_SUBMITTED";
    pub const ETH_TX_MSG_MINED: &str = "ETH_TX_MSG_MINED";
    pub const ETH_TX_MSG_FAILED: &str = "ETH_TX_MSG_FAILED";
}

use super::state::{StatusColumn, StatusUpdate};
use crate::database::{TransferFilter, TransferStore};
use crate::error::Result;
use crate::models::status::*;
use crate::models::{Transfer, TransferRecord};
use log::debug;
use std::sync::Arc;

// Named transfer operations on top of a guarded store
#[derive(Clone)]
pub struct TransferRepository {
    store: Arc<dyn TransferStore>,
}

impl TransferRepository {
    pub fn new(store: Arc<dyn TransferStore>) -> Self {
        TransferRepository { store }
    }

    pub async fn get_by_transaction_id(&self, transaction_id: &str) -> Result<Option<TransferRecord>> {
        self.store.get(transaction_id).await
    }

    // Stores a transfer awaiting signatures; an existing record is returned unchanged
    pub async fn create(&self, transfer: &Transfer) -> Result<TransferRecord> {
        self.store.insert_if_absent(TransferRecord::new(transfer, INITIAL)).await
    }

    // Stores a transfer observed in the backlog by a read-only watcher
    pub async fn save_recovered(&self, transfer: &Transfer) -> Result<TransferRecord> {
        self.store.insert_if_absent(TransferRecord::new(transfer, RECOVERED)).await
    }

    pub async fn update_status_insufficient_fee(&self, transaction_id: &str) -> Result<()> {
        self.update_status(transaction_id, INSUFFICIENT_FEE).await
    }

    pub async fn update_status_completed(&self, transaction_id: &str) -> Result<()> {
        self.update_status(transaction_id, COMPLETED).await
    }

    pub async fn update_status_signature_submitted(&self, transaction_id: &str) -> Result<()> {
        let update = StatusUpdate::single(StatusColumn::SignatureMsgStatus, SIGNATURE_SUBMITTED)
            .and(StatusColumn::Status, IN_PROGRESS);
        self.store.apply(transaction_id, &update).await?;
        debug!(
            "[{}] - Updated Status to [{}] and SignatureMsgStatus to [{}]",
            transaction_id, IN_PROGRESS, SIGNATURE_SUBMITTED
        );
        Ok(())
    }

    pub async fn update_status_signature_mined(&self, transaction_id: &str) -> Result<()> {
        self.update_column(transaction_id, StatusColumn::SignatureMsgStatus, SIGNATURE_MINED)
            .await
    }

    pub async fn update_status_signature_failed(&self, transaction_id: &str) -> Result<()> {
        self.update_column(transaction_id, StatusColumn::SignatureMsgStatus, SIGNATURE_FAILED)
            .await
    }

    pub async fn update_eth_tx_submitted(&self, transaction_id: &str, hash: &str) -> Result<()> {
        let update = StatusUpdate::single(StatusColumn::EthTxStatus, ETH_TX_SUBMITTED).with_eth_tx_hash(hash);
        self.store.apply(transaction_id, &update).await?;
        debug!(
            "[{}] - Updated Ethereum TX Status to [{}] with hash [{}]",
            transaction_id, ETH_TX_SUBMITTED, hash
        );
        Ok(())
    }

    // A mined transaction completes the transfer
    pub async fn update_eth_tx_mined(&self, transaction_id: &str) -> Result<()> {
        let update =
            StatusUpdate::single(StatusColumn::EthTxStatus, ETH_TX_MINED).and(StatusColumn::Status, COMPLETED);
        self.store.apply(transaction_id, &update).await?;
        debug!(
            "[{}] - Updated Ethereum TX Status to [{}] and Transfer status to [{}]",
            transaction_id, ETH_TX_MINED, COMPLETED
        );
        Ok(())
    }

    // A reverted transaction fails the transfer
    pub async fn update_eth_tx_reverted(&self, transaction_id: &str) -> Result<()> {
        let update =
            StatusUpdate::single(StatusColumn::EthTxStatus, ETH_TX_REVERTED).and(StatusColumn::Status, FAILED);
        self.store.apply(transaction_id, &update).await?;
        debug!(
            "[{}] - Updated Ethereum TX Status to [{}] and Transfer status to [{}]",
            transaction_id, ETH_TX_REVERTED, FAILED
        );
        Ok(())
    }

    pub async fn update_status_eth_tx_msg_submitted(&self, transaction_id: &str) -> Result<()> {
        self.update_column(transaction_id, StatusColumn::EthTxMsgStatus, ETH_TX_MSG_SUBMITTED)
            .await
    }

    pub async fn update_status_eth_tx_msg_mined(&self, transaction_id: &str) -> Result<()> {
        self.update_column(transaction_id, StatusColumn::EthTxMsgStatus, ETH_TX_MSG_MINED)
            .await
    }

    pub async fn update_status_eth_tx_msg_failed(&self, transaction_id: &str) -> Result<()> {
        self.update_column(transaction_id, StatusColumn::EthTxMsgStatus, ETH_TX_MSG_FAILED)
            .await
    }

    // Single-column Ethereum tx update; leaves the overall status alone
    pub async fn update_ethereum_tx_status(&self, transaction_id: &str, status: &str) -> Result<()> {
        self.update_column(transaction_id, StatusColumn::EthTxStatus, status)
            .await
    }

    // Guarded single-column update
    pub async fn update_column(&self, transaction_id: &str, column: StatusColumn, status: &str) -> Result<()> {
        self.store
            .apply(transaction_id, &StatusUpdate::single(column, status))
            .await?;
        debug!("[{}] - Column [{}] status to [{}]", transaction_id, column.name(), status);
        Ok(())
    }

    pub async fn get_unprocessed_transfers(&self) -> Result<Vec<TransferRecord>> {
        let filter = TransferFilter {
            statuses: vec![INITIAL, RECOVERED],
            signature_msg_statuses: vec![],
        };
        self.store.find(&filter).await
    }

    pub async fn get_initial_and_signature_submitted(&self) -> Result<Vec<TransferRecord>> {
        let filter = TransferFilter {
            statuses: vec![INITIAL],
            signature_msg_statuses: vec![SIGNATURE_SUBMITTED],
        };
        self.store.find(&filter).await
    }

    async fn update_status(&self, transaction_id: &str, status: &str) -> Result<()> {
        self.update_column(transaction_id, StatusColumn::Status, status)
            .await
    }
}

use super::progress::ProgressStore;
use super::transfers::{TransferFilter, TransferStore};
use crate::error::{BridgeError, Result};
use crate::models::TransferRecord;
use crate::transfer::state::StatusUpdate;
use async_trait::async_trait;
use dashmap::DashMap;

// Watermarks kept in process memory
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    blocks: DashMap<String, u64>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn get(&self, identity: &str) -> Result<u64> {
        self.blocks
            .get(identity)
            .map(|entry| *entry.value())
            .ok_or_else(|| BridgeError::NotFound(format!("watcher status [{}]", identity)))
    }

    async fn create(&self, identity: &str, block: u64) -> Result<()> {
        self.blocks.insert(identity.to_string(), block);
        Ok(())
    }

    async fn update(&self, identity: &str, block: u64) -> Result<()> {
        self.blocks.insert(identity.to_string(), block);
        Ok(())
    }
}

// Transfer records kept in process memory
#[derive(Debug, Default)]
pub struct MemoryTransferStore {
    records: DashMap<String, TransferRecord>,
}

impl MemoryTransferStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferStore for MemoryTransferStore {
    async fn insert_if_absent(&self, record: TransferRecord) -> Result<TransferRecord> {
        let entry = self
            .records
            .entry(record.transaction_id.clone())
            .or_insert(record);
        Ok(entry.value().clone())
    }

    async fn get(&self, transaction_id: &str) -> Result<Option<TransferRecord>> {
        Ok(self.records.get(transaction_id).map(|entry| entry.value().clone()))
    }

    async fn find(&self, filter: &TransferFilter) -> Result<Vec<TransferRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn apply(&self, transaction_id: &str, update: &StatusUpdate) -> Result<()> {
        update.check_values()?;

        // The shard lock is held across check and write
        let mut record = self
            .records
            .get_mut(transaction_id)
            .ok_or_else(|| BridgeError::NotFound(format!("transfer [{}]", transaction_id)))?;
        update.check_against(record.value())?;
        update.apply_to(record.value_mut());
        Ok(())
    }
}

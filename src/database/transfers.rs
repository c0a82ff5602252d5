use crate::error::{BridgeError, Result};
use crate::models::TransferRecord;
use crate::transfer::state::StatusUpdate;
use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};

const TRANSFER_COLUMNS: &str = "transaction_id, source_chain_id, target_chain_id, native_chain_id, \
    source_asset, target_asset, native_asset, receiver, amount, timestamp, status, \
    signature_msg_status, eth_tx_status, eth_tx_msg_status, eth_tx_hash";

// Records whose overall status or signature track is in one of the listed values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferFilter {
    pub statuses: Vec<&'static str>,
    pub signature_msg_statuses: Vec<&'static str>,
}

impl TransferFilter {
    pub fn matches(&self, record: &TransferRecord) -> bool {
        self.statuses.contains(&record.status.as_str())
            || record
                .signature_msg_status
                .as_deref()
                .map_or(false, |s| self.signature_msg_statuses.contains(&s))
    }
}

// Persistence of transfer records and their guarded status tracks
#[async_trait]
pub trait TransferStore: Send + Sync {
    // Inserts the record unless the transaction id is taken; returns what is stored
    async fn insert_if_absent(&self, record: TransferRecord) -> Result<TransferRecord>;
    async fn get(&self, transaction_id: &str) -> Result<Option<TransferRecord>>;
    async fn find(&self, filter: &TransferFilter) -> Result<Vec<TransferRecord>>;
    // Checks every change against the stored row and writes all of them or none
    async fn apply(&self, transaction_id: &str, update: &StatusUpdate) -> Result<()>;
}

// Transfer store backed by the transfers table
#[derive(Clone)]
pub struct PgTransferStore {
    pool: Pool<Postgres>,
}

impl PgTransferStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        PgTransferStore { pool }
    }
}

#[async_trait]
impl TransferStore for PgTransferStore {
    async fn insert_if_absent(&self, record: TransferRecord) -> Result<TransferRecord> {
        sqlx::query(
            r#"
            INSERT INTO transfers (transaction_id, source_chain_id, target_chain_id, native_chain_id,
                source_asset, target_asset, native_asset, receiver, amount, timestamp, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (transaction_id) DO NOTHING
            "#
        )
        .bind(&record.transaction_id)
        .bind(record.source_chain_id)
        .bind(record.target_chain_id)
        .bind(record.native_chain_id)
        .bind(&record.source_asset)
        .bind(&record.target_asset)
        .bind(&record.native_asset)
        .bind(&record.receiver)
        .bind(&record.amount)
        .bind(&record.timestamp)
        .bind(&record.status)
        .execute(&self.pool)
        .await?;

        // Read back whichever row won
        self.get(&record.transaction_id)
            .await?
            .ok_or_else(|| BridgeError::NotFound(format!("transfer [{}]", record.transaction_id)))
    }

    async fn get(&self, transaction_id: &str) -> Result<Option<TransferRecord>> {
        let record = sqlx::query_as(&format!(
            "SELECT {} FROM transfers WHERE transaction_id = $1",
            TRANSFER_COLUMNS
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn find(&self, filter: &TransferFilter) -> Result<Vec<TransferRecord>> {
        let mut query_builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM transfers WHERE false",
            TRANSFER_COLUMNS
        ));

        if !filter.statuses.is_empty() {
            query_builder.push(" OR status = ANY(");
            query_builder.push_bind(filter.statuses.iter().map(|s| s.to_string()).collect::<Vec<_>>());
            query_builder.push(")");
        }

        if !filter.signature_msg_statuses.is_empty() {
            query_builder.push(" OR signature_msg_status = ANY(");
            query_builder.push_bind(
                filter
                    .signature_msg_statuses
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>(),
            );
            query_builder.push(")");
        }

        let records = query_builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(records)
    }

    async fn apply(&self, transaction_id: &str, update: &StatusUpdate) -> Result<()> {
        // Fail closed on unknown values before touching the row
        update.check_values()?;
        if update.changes.is_empty() && update.eth_tx_hash.is_none() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        // Lock the row so the edge check and the write see the same values
        let record: Option<TransferRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM transfers WHERE transaction_id = $1 FOR UPDATE",
            TRANSFER_COLUMNS
        ))
        .bind(transaction_id)
        .fetch_optional(&mut *tx)
        .await?;
        let record = record.ok_or_else(|| BridgeError::NotFound(format!("transfer [{}]", transaction_id)))?;

        // Dropping the transaction on error rolls it back
        update.check_against(&record)?;

        let mut query_builder = QueryBuilder::<Postgres>::new("UPDATE transfers SET ");
        let mut assignments = query_builder.separated(", ");
        for (column, status) in &update.changes {
            assignments.push(format!("{} = ", column.name()));
            assignments.push_bind_unseparated(status.clone());
        }
        if let Some(hash) = &update.eth_tx_hash {
            assignments.push("eth_tx_hash = ");
            assignments.push_bind_unseparated(hash.clone());
        }
        query_builder.push(" WHERE transaction_id = ");
        query_builder.push_bind(transaction_id);

        query_builder.build().execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

use crate::error::{BridgeError, Result};
use crate::models::WatcherStatus;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};

// Durable per-watcher watermark: the next block a watcher must process
#[async_trait]
pub trait ProgressStore: Send + Sync {
    // Stored block for the identity, `BridgeError::NotFound` when absent
    async fn get(&self, identity: &str) -> Result<u64>;
    async fn create(&self, identity: &str, block: u64) -> Result<()>;
    // Overwrites the watermark, inserting the row when missing
    async fn update(&self, identity: &str, block: u64) -> Result<()>;
}

fn to_db_block(block: u64) -> Result<i64> {
    i64::try_from(block).map_err(|_| BridgeError::Decode(format!("block {} exceeds BIGINT", block)))
}

fn from_db_block(block: i64) -> Result<u64> {
    u64::try_from(block).map_err(|_| BridgeError::Decode(format!("negative block {} in watcher_status", block)))
}

// Progress store backed by the watcher_status table
#[derive(Clone)]
pub struct PgProgressStore {
    pool: Pool<Postgres>,
}

impl PgProgressStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        PgProgressStore { pool }
    }
}

#[async_trait]
impl ProgressStore for PgProgressStore {
    async fn get(&self, identity: &str) -> Result<u64> {
        // Query the last processed block for this watcher
        let status: Option<WatcherStatus> = sqlx::query_as(
            "SELECT identity, last_processed_block FROM watcher_status WHERE identity = $1"
        )
        .bind(identity)
        .fetch_optional(&self.pool)
        .await?;

        match status {
            Some(status) => from_db_block(status.last_processed_block),
            None => Err(BridgeError::NotFound(format!("watcher status [{}]", identity))),
        }
    }

    async fn create(&self, identity: &str, block: u64) -> Result<()> {
        sqlx::query(
            "INSERT INTO watcher_status (identity, last_processed_block) VALUES ($1, $2)"
        )
        .bind(identity)
        .bind(to_db_block(block)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, identity: &str, block: u64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO watcher_status (identity, last_processed_block)
            VALUES ($1, $2)
            ON CONFLICT (identity) DO UPDATE SET last_processed_block = EXCLUDED.last_processed_block
            "#
        )
        .bind(identity)
        .bind(to_db_block(block)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

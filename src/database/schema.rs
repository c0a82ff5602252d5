use sqlx::{Pool, Postgres};

// Creates the watermark and transfer tables when missing
pub async fn init_db(pool: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS watcher_status (
            identity TEXT PRIMARY KEY,
            last_processed_block BIGINT NOT NULL
        )
        "#
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transfers (
            transaction_id TEXT PRIMARY KEY,
            source_chain_id BIGINT NOT NULL,
            target_chain_id BIGINT NOT NULL,
            native_chain_id BIGINT NOT NULL,
            source_asset TEXT NOT NULL,
            target_asset TEXT NOT NULL,
            native_asset TEXT NOT NULL,
            receiver TEXT NOT NULL,
            amount TEXT NOT NULL,
            timestamp TEXT,
            status TEXT NOT NULL,
            signature_msg_status TEXT,
            eth_tx_status TEXT,
            eth_tx_msg_status TEXT,
            eth_tx_hash TEXT
        )
        "#
    )
    .execute(pool)
    .await?;

    // Backs the unprocessed-transfer scans
    for column in ["status", "signature_msg_status"] {
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_transfers_{column} ON transfers ({column})"
        ))
        .execute(pool)
        .await?;
    }
    Ok(())
}

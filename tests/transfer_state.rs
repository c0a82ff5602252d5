use bridgewatch::database::MemoryTransferStore;
use bridgewatch::error::BridgeError;
use bridgewatch::models::status::*;
use bridgewatch::models::Transfer;
use bridgewatch::transfer::{StatusColumn, TransferRepository};
use std::sync::Arc;

fn transfer(id: &str) -> Transfer {
    Transfer {
        transaction_id: id.to_string(),
        source_chain_id: 1,
        target_chain_id: 137,
        native_chain_id: 1,
        source_asset: "0x1111111111111111111111111111111111111111".to_string(),
        target_asset: "0x2222222222222222222222222222222222222222".to_string(),
        native_asset: "0x1111111111111111111111111111111111111111".to_string(),
        receiver: "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_string(),
        amount: "900".to_string(),
        timestamp: None,
    }
}

async fn repository_with(ids: &[&str]) -> TransferRepository {
    let repository = TransferRepository::new(Arc::new(MemoryTransferStore::new()));
    for id in ids {
        repository.create(&transfer(id)).await.unwrap();
    }
    repository
}

#[tokio::test]
async fn signature_status_rejects_moves_outside_allow_list() {
    let repository = repository_with(&["t1"]).await;
    repository.update_status_signature_submitted("t1").await.unwrap();

    for value in [SIGNATURE_SUBMITTED, ETH_TX_MINED, COMPLETED, "SIGNED"] {
        let result = repository
            .update_column("t1", StatusColumn::SignatureMsgStatus, value)
            .await;
        assert!(result.is_err(), "{} accepted", value);

        let record = repository.get_by_transaction_id("t1").await.unwrap().unwrap();
        assert_eq!(record.signature_msg_status.as_deref(), Some(SIGNATURE_SUBMITTED));
        assert_eq!(record.status, IN_PROGRESS);
    }

    repository.update_status_signature_mined("t1").await.unwrap();
    let record = repository.get_by_transaction_id("t1").await.unwrap().unwrap();
    assert_eq!(record.signature_msg_status.as_deref(), Some(SIGNATURE_MINED));
}

#[tokio::test]
async fn unknown_value_is_invalid_status() {
    let repository = repository_with(&["t1"]).await;
    let err = repository
        .update_column("t1", StatusColumn::Status, "DONE")
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::InvalidStatus { column: "status", .. }));
}

#[tokio::test]
async fn mined_eth_tx_completes_transfer() {
    let repository = repository_with(&["t1"]).await;
    repository.update_status_signature_submitted("t1").await.unwrap();
    repository.update_eth_tx_submitted("t1", "0xfeed").await.unwrap();

    let record = repository.get_by_transaction_id("t1").await.unwrap().unwrap();
    assert_eq!(record.eth_tx_status.as_deref(), Some(ETH_TX_SUBMITTED));
    assert_eq!(record.eth_tx_hash.as_deref(), Some("0xfeed"));

    repository.update_eth_tx_mined("t1").await.unwrap();
    let record = repository.get_by_transaction_id("t1").await.unwrap().unwrap();
    assert_eq!(record.eth_tx_status.as_deref(), Some(ETH_TX_MINED));
    assert_eq!(record.status, COMPLETED);
}

#[tokio::test]
async fn reverted_eth_tx_fails_transfer() {
    let repository = repository_with(&["t1"]).await;
    repository.update_eth_tx_submitted("t1", "0xfeed").await.unwrap();
    repository.update_eth_tx_reverted("t1").await.unwrap();

    let record = repository.get_by_transaction_id("t1").await.unwrap().unwrap();
    assert_eq!(record.eth_tx_status.as_deref(), Some(ETH_TX_REVERTED));
    assert_eq!(record.status, FAILED);
}

#[tokio::test]
async fn composite_update_is_all_or_nothing() {
    let repository = repository_with(&["t1"]).await;

    // Eth tx was never submitted
    let err = repository.update_eth_tx_mined("t1").await.unwrap_err();
    assert!(matches!(err, BridgeError::InvalidTransition { column: "eth_tx_status", .. }));

    let record = repository.get_by_transaction_id("t1").await.unwrap().unwrap();
    assert_eq!(record.status, INITIAL);
    assert_eq!(record.eth_tx_status, None);
}

#[tokio::test]
async fn generic_eth_tx_update_leaves_overall_status() {
    let repository = repository_with(&["t1"]).await;
    repository.update_status_signature_submitted("t1").await.unwrap();
    repository.update_ethereum_tx_status("t1", ETH_TX_SUBMITTED).await.unwrap();
    repository.update_ethereum_tx_status("t1", ETH_TX_MINED).await.unwrap();

    let record = repository.get_by_transaction_id("t1").await.unwrap().unwrap();
    assert_eq!(record.eth_tx_status.as_deref(), Some(ETH_TX_MINED));
    assert_eq!(record.status, IN_PROGRESS);

    assert!(repository.update_ethereum_tx_status("t1", ETH_TX_MSG_MINED).await.is_err());
}

#[tokio::test]
async fn eth_tx_msg_track_moves_independently() {
    let repository = repository_with(&["t1"]).await;
    repository.update_status_eth_tx_msg_submitted("t1").await.unwrap();
    repository.update_status_eth_tx_msg_failed("t1").await.unwrap();
    assert!(repository.update_status_eth_tx_msg_mined("t1").await.is_err());

    let record = repository.get_by_transaction_id("t1").await.unwrap().unwrap();
    assert_eq!(record.eth_tx_msg_status.as_deref(), Some(ETH_TX_MSG_FAILED));
    assert_eq!(record.status, INITIAL);
}

#[tokio::test]
async fn terminal_overall_status_is_final() {
    let repository = repository_with(&["t1"]).await;
    repository.update_status_insufficient_fee("t1").await.unwrap();
    assert!(repository.update_status_completed("t1").await.is_err());

    let record = repository.get_by_transaction_id("t1").await.unwrap().unwrap();
    assert_eq!(record.status, INSUFFICIENT_FEE);
}

#[tokio::test]
async fn updating_unknown_transfer_is_not_found() {
    let repository = repository_with(&[]).await;
    let err = repository.update_status_completed("missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn unprocessed_queries_filter_by_tracks() {
    let repository = repository_with(&["initial", "signing"]).await;
    repository.save_recovered(&transfer("recovered")).await.unwrap();
    repository.update_status_signature_submitted("signing").await.unwrap();
    repository.create(&transfer("done")).await.unwrap();
    repository.update_status_completed("done").await.unwrap();

    let mut unprocessed: Vec<_> = repository
        .get_unprocessed_transfers()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.transaction_id)
        .collect();
    unprocessed.sort();
    assert_eq!(unprocessed, vec!["initial", "recovered"]);

    let mut pending: Vec<_> = repository
        .get_initial_and_signature_submitted()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.transaction_id)
        .collect();
    pending.sort();
    assert_eq!(pending, vec!["initial", "signing"]);
}

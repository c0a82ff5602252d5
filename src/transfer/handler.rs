use super::repository::TransferRepository;
use crate::error::Result;
use crate::models::status;
use crate::queue::{topics, ChannelQueue, Message};
use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// Persists classified transfers as they arrive on the queue
pub struct TransferHandler {
    repository: TransferRepository,
}

impl TransferHandler {
    pub fn new(repository: TransferRepository) -> Self {
        TransferHandler { repository }
    }

    pub async fn handle(&self, message: &Message) -> Result<()> {
        let transfer = &message.payload;

        if topics::is_read_only(&message.topic) {
            let record = self.repository.save_recovered(transfer).await?;
            debug!(
                "[{}] - Recorded backlog transfer with status [{}]",
                transfer.transaction_id, record.status
            );
            return Ok(());
        }

        let record = self.repository.create(transfer).await?;
        if record.status != status::INITIAL {
            debug!(
                "[{}] - Transfer already processed with status [{}], skipping",
                transfer.transaction_id, record.status
            );
            return Ok(());
        }

        info!(
            "[{}] - New transfer [{}] -> [{}] of [{}] queued for signing on [{}]",
            transfer.transaction_id, transfer.source_chain_id, transfer.target_chain_id, transfer.amount, message.topic
        );
        Ok(())
    }

    // Subscribes to every transfer topic; one task per topic
    pub fn spawn(self: Arc<Self>, queue: &ChannelQueue) -> Vec<JoinHandle<()>> {
        topics::SIGNING
            .iter()
            .chain(topics::READ_ONLY.iter())
            .map(|topic| {
                let receiver = queue.subscribe(topic);
                let handler = Arc::clone(&self);
                tokio::spawn(async move { handler.consume(receiver).await })
            })
            .collect()
    }

    async fn consume(&self, mut receiver: mpsc::UnboundedReceiver<Message>) {
        while let Some(message) = receiver.recv().await {
            if let Err(e) = self.handle(&message).await {
                error!(
                    "[{}] - Failed to persist transfer from topic [{}]: {}",
                    message.payload.transaction_id, message.topic, e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryTransferStore;
    use crate::models::Transfer;
    use crate::queue::Queue;
    use std::time::Duration;

    fn transfer(id: &str) -> Transfer {
        Transfer {
            transaction_id: id.to_string(),
            source_chain_id: 1,
            target_chain_id: 296,
            native_chain_id: 1,
            source_asset: "0xaaa".to_string(),
            target_asset: "0.0.1".to_string(),
            native_asset: "0xaaa".to_string(),
            receiver: "0.0.2".to_string(),
            amount: "10".to_string(),
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn read_only_topics_store_recovered_records() {
        let repository = TransferRepository::new(Arc::new(MemoryTransferStore::new()));
        let handler = TransferHandler::new(repository.clone());

        let message = Message {
            topic: topics::READ_ONLY_TRANSFER_SAVE.to_string(),
            payload: transfer("0x1-0"),
        };
        handler.handle(&message).await.unwrap();

        let record = repository.get_by_transaction_id("0x1-0").await.unwrap().unwrap();
        assert_eq!(record.status, status::RECOVERED);
    }

    #[tokio::test]
    async fn duplicate_delivery_keeps_progress() {
        let repository = TransferRepository::new(Arc::new(MemoryTransferStore::new()));
        let handler = TransferHandler::new(repository.clone());
        let message = Message {
            topic: topics::TOPIC_MESSAGE_SUBMISSION.to_string(),
            payload: transfer("0x1-0"),
        };

        handler.handle(&message).await.unwrap();
        repository.update_status_signature_submitted("0x1-0").await.unwrap();
        handler.handle(&message).await.unwrap();

        let record = repository.get_by_transaction_id("0x1-0").await.unwrap().unwrap();
        assert_eq!(record.status, status::IN_PROGRESS);
    }

    #[tokio::test]
    async fn spawned_consumers_drain_the_queue() {
        let repository = TransferRepository::new(Arc::new(MemoryTransferStore::new()));
        let queue = ChannelQueue::new();
        let handles = Arc::new(TransferHandler::new(repository.clone())).spawn(&queue);
        assert_eq!(handles.len(), 6);

        queue.push(Message {
            topic: topics::HEDERA_MINT_HTS_TRANSFER.to_string(),
            payload: transfer("0x2-1"),
        });

        let mut stored = None;
        for _ in 0..50 {
            stored = repository.get_by_transaction_id("0x2-1").await.unwrap();
            if stored.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(stored.unwrap().status, status::INITIAL);
    }
}

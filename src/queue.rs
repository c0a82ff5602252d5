use crate::models::Transfer;
use dashmap::DashMap;
use log::{debug, warn};
use tokio::sync::mpsc;

// Routing topics for classified transfers
pub mod topics {
    // Live transfer towards an EVM chain, awaiting validator signatures
    pub const TOPIC_MESSAGE_SUBMISSION: &str = "TOPIC_MESSAGE_SUBMISSION";
    // Live burn towards the settlement chain, handled with fees
    pub const HEDERA_FEE_TRANSFER: &str = "HEDERA_FEE_TRANSFER";
    // Live lock towards the settlement chain, minted there
    pub const HEDERA_MINT_HTS_TRANSFER: &str = "HEDERA_MINT_HTS_TRANSFER";
    // Backlog burn towards the settlement chain
    pub const READ_ONLY_HEDERA_TRANSFER: &str = "READ_ONLY_HEDERA_TRANSFER";
    // Backlog lock towards the settlement chain
    pub const READ_ONLY_HEDERA_MINT_HTS_TRANSFER: &str = "READ_ONLY_HEDERA_MINT_HTS_TRANSFER";
    // Backlog transfer towards an EVM chain
    pub const READ_ONLY_TRANSFER_SAVE: &str = "READ_ONLY_TRANSFER_SAVE";

    // Topics whose transfers must be signed by this validator
    pub const SIGNING: [&str; 3] = [TOPIC_MESSAGE_SUBMISSION, HEDERA_FEE_TRANSFER, HEDERA_MINT_HTS_TRANSFER];
    // Topics whose transfers are only recorded
    pub const READ_ONLY: [&str; 3] = [
        READ_ONLY_HEDERA_TRANSFER,
        READ_ONLY_HEDERA_MINT_HTS_TRANSFER,
        READ_ONLY_TRANSFER_SAVE,
    ];

    pub fn is_read_only(topic: &str) -> bool {
        READ_ONLY.contains(&topic)
    }
}

// A transfer addressed to a topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Transfer,
}

// Topic-addressed message bus; push must be safe from many watcher tasks at once
pub trait Queue: Send + Sync {
    fn push(&self, message: Message);
}

// In-process queue delivering each topic to a single subscriber channel
#[derive(Default)]
pub struct ChannelQueue {
    subscribers: DashMap<String, mpsc::UnboundedSender<Message>>,
}

impl ChannelQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // Registers the consumer of a topic, replacing any previous one
    pub fn subscribe(&self, topic: &str) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.insert(topic.to_string(), tx);
        rx
    }
}

impl Queue for ChannelQueue {
    fn push(&self, message: Message) {
        crate::metrics::TRANSFERS_DISPATCHED
            .with_label_values(&[message.topic.as_str()])
            .inc();

        match self.subscribers.get(&message.topic) {
            Some(sender) => {
                debug!(
                    "[{}] - Pushing transfer to topic [{}]",
                    message.payload.transaction_id, message.topic
                );
                if let Err(e) = sender.send(message) {
                    warn!(
                        "[{}] - Subscriber of topic [{}] is gone, transfer dropped",
                        e.0.payload.transaction_id, e.0.topic
                    );
                }
            }
            None => warn!(
                "[{}] - No subscriber for topic [{}], transfer dropped",
                message.payload.transaction_id, message.topic
            ),
        }
    }
}

use super::contract::MemberRegistry;
use super::events::{BurnEvent, LockEvent, MintEvent, RouterEvent, UnlockEvent};
use super::fetcher::ChainClient;
use crate::assets::AssetRegistry;
use crate::error::Result;
use crate::metrics::{TransferLabels, TransferMetrics};
use crate::models::Transfer;
use crate::queue::{topics, Message, Queue};
use crate::utils::{bytes_to_address, decode_account_id};
use log::{debug, error, info, warn};
use num_bigint::BigUint;
use std::fmt;
use std::sync::Arc;

// Position of a log on chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMeta {
    pub transaction_hash: String,
    pub log_index: u64,
    pub block_number: u64,
}

// Business-rule reasons for dropping an event; retrying would reproduce them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    EmptyReceiver,
    InvalidReceiver(String),
    MissingAsset(String),
    WrappedToWrapped { native_chain: u64, target_chain: u64 },
    DecimalsAdjustment(String),
    InsufficientAmount,
    BelowMinimum { amount: BigUint, minimum: BigUint },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::EmptyReceiver => write!(f, "Empty receiver account"),
            Rejection::InvalidReceiver(e) => write!(f, "Failed to parse receiver: {}", e),
            Rejection::MissingAsset(asset) => write!(f, "No asset mapping for [{}]", asset),
            Rejection::WrappedToWrapped { native_chain, target_chain } => write!(
                f,
                "Wrapped to Wrapped transfers currently not supported: native chain [{}], target chain [{}]",
                native_chain, target_chain
            ),
            Rejection::DecimalsAdjustment(e) => write!(f, "Failed to adjust decimals between chains: {}", e),
            Rejection::InsufficientAmount => write!(f, "Insufficient amount provided"),
            Rejection::BelowMinimum { amount, minimum } => {
                write!(f, "Transfer Amount [{}] less than Minimum Amount [{}]", amount, minimum)
            }
        }
    }
}

// Result of handling one decoded event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    // Transfer built for the given topic
    Dispatched(&'static str),
    // Completion metrics updated, nothing queued
    Tracked,
    // Member refresh spawned
    MembersRefreshScheduled,
    // Dropped by a business rule
    Rejected(Rejection),
}

// Builds canonical transfers from router events and routes them to queue topics
pub struct TransferClassifier {
    client: Arc<dyn ChainClient>,
    registry: Arc<dyn AssetRegistry>,
    members: Arc<dyn MemberRegistry>,
    metrics: Arc<dyn TransferMetrics>,
    queue: Arc<dyn Queue>,
    validator: bool,
    settlement_chain_id: u64,
    // Events at or above this block are live; below it they are backlog
    live_cutoff: u64,
}

impl TransferClassifier {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: Arc<dyn ChainClient>,
        registry: Arc<dyn AssetRegistry>,
        members: Arc<dyn MemberRegistry>,
        metrics: Arc<dyn TransferMetrics>,
        queue: Arc<dyn Queue>,
        validator: bool,
        settlement_chain_id: u64,
    ) -> Self {
        TransferClassifier {
            client,
            registry,
            members,
            metrics,
            queue,
            validator,
            settlement_chain_id,
            live_cutoff: 0,
        }
    }

    // Sets the block from which events are considered live
    pub fn with_live_cutoff(mut self, live_cutoff: u64) -> Self {
        self.live_cutoff = live_cutoff;
        self
    }

    // Classifies one event without queuing anything; `Err` is transient and the enclosing range must be retried
    pub async fn classify(&self, meta: &LogMeta, event: RouterEvent) -> Result<(Classification, Option<Message>)> {
        let (classification, message) = match event {
            RouterEvent::Lock(lock) => self.handle_lock(meta, lock).await?,
            RouterEvent::Burn(burn) => self.handle_burn(meta, burn).await?,
            RouterEvent::Mint(mint) => (self.handle_mint(meta, mint).await?, None),
            RouterEvent::Unlock(unlock) => (self.handle_unlock(meta, unlock).await?, None),
            RouterEvent::MemberUpdated(update) => {
                debug!(
                    "[{}] - Member [{}] updated, status [{}]",
                    meta.transaction_hash, update.member, update.status
                );
                self.schedule_members_refresh();
                (Classification::MembersRefreshScheduled, None)
            }
        };

        if let Classification::Rejected(reason) = &classification {
            error!("[{}] - {}.", meta.transaction_hash, reason);
        }
        Ok((classification, message))
    }

    // Queues classified transfers in order
    pub fn publish(&self, messages: Vec<Message>) {
        for message in messages {
            debug!("[{}] - Dispatched to [{}]", message.payload.transaction_id, message.topic);
            self.queue.push(message);
        }
    }

    // Fire-and-forget refresh; failures are only logged
    fn schedule_members_refresh(&self) {
        let members = self.members.clone();
        tokio::spawn(async move {
            if let Err(e) = members.reload_members().await {
                warn!("Failed to reload router members. Error: [{}]", e);
            }
        });
    }

    async fn handle_lock(&self, meta: &LogMeta, event: LockEvent) -> Result<(Classification, Option<Message>)> {
        debug!("[{}] - New Lock Event Log received.", meta.transaction_hash);

        if event.receiver.is_empty() {
            return Ok(rejected(Rejection::EmptyReceiver));
        }

        let source_chain_id = self.client.chain_id().await?;
        let target_chain_id = event.target_chain;

        let receiver = match self.decode_receiver(&event.receiver, target_chain_id) {
            Ok(receiver) => receiver,
            Err(rejection) => return Ok(rejected(rejection)),
        };

        let wrapped_asset = match self.registry.native_to_wrapped(&event.token, source_chain_id, target_chain_id) {
            Some(asset) => asset,
            None => return Ok(rejected(Rejection::MissingAsset(event.token))),
        };
        let native_asset = match self.registry.fungible_native_asset(source_chain_id, &event.token) {
            Some(asset) => asset,
            None => return Ok(rejected(Rejection::MissingAsset(event.token))),
        };

        if event.service_fee >= event.amount {
            return Ok(rejected(Rejection::InsufficientAmount));
        }
        // The minimum is expressed in the source chain's precision
        let amount = &event.amount - &event.service_fee;
        if amount < native_asset.min_amount {
            return Ok(rejected(Rejection::BelowMinimum {
                amount,
                minimum: native_asset.min_amount.clone(),
            }));
        }
        let amount = match self.adjust_amount(&amount, &event.token, source_chain_id, target_chain_id) {
            Ok(amount) => amount,
            Err(rejection) => return Ok(rejected(rejection)),
        };

        let transfer = Transfer {
            transaction_id: format!("{}-{}", meta.transaction_hash, meta.log_index),
            source_chain_id,
            target_chain_id,
            native_chain_id: source_chain_id,
            source_asset: event.token.clone(),
            target_asset: wrapped_asset,
            native_asset: event.token.clone(),
            receiver,
            amount: amount.to_string(),
            timestamp: None,
        };

        info!(
            "[{}] - New Lock Event Log with Amount [{}], Receiver Address [{}], Source Chain [{}] and Target Chain [{}] has been found.",
            meta.transaction_hash, transfer.amount, transfer.receiver, source_chain_id, target_chain_id
        );

        if self.metrics.is_monitoring_enabled() {
            let labels = self.labels(&transfer);
            if target_chain_id != self.settlement_chain_id {
                self.metrics.create_majority_reached_if_not_exists(&labels);
            }
            self.metrics.create_user_get_his_tokens_if_not_exists(&labels);
        }

        let (topic, message) = self
            .route(meta, transfer, topics::HEDERA_MINT_HTS_TRANSFER, topics::READ_ONLY_HEDERA_MINT_HTS_TRANSFER)
            .await?;
        Ok((Classification::Dispatched(topic), Some(message)))
    }

    async fn handle_burn(&self, meta: &LogMeta, event: BurnEvent) -> Result<(Classification, Option<Message>)> {
        debug!("[{}] - New Burn Event Log received.", meta.transaction_hash);

        if event.receiver.is_empty() {
            return Ok(rejected(Rejection::EmptyReceiver));
        }

        let source_chain_id = self.client.chain_id().await?;
        let target_chain_id = event.target_chain;

        let native_asset = match self.registry.wrapped_to_native(&event.token, source_chain_id) {
            Some(asset) => asset,
            None => return Ok(rejected(Rejection::MissingAsset(event.token))),
        };

        if target_chain_id != native_asset.chain_id {
            return Ok(rejected(Rejection::WrappedToWrapped {
                native_chain: native_asset.chain_id,
                target_chain: target_chain_id,
            }));
        }

        let receiver = match self.decode_receiver(&event.receiver, target_chain_id) {
            Ok(receiver) => receiver,
            Err(rejection) => return Ok(rejected(rejection)),
        };

        // Burns settle on the native chain, where the minimum is expressed
        let amount = match self.adjust_amount(&event.amount, &event.token, source_chain_id, target_chain_id) {
            Ok(amount) => amount,
            Err(rejection) => return Ok(rejected(rejection)),
        };
        if amount < native_asset.min_amount {
            return Ok(rejected(Rejection::BelowMinimum {
                amount,
                minimum: native_asset.min_amount.clone(),
            }));
        }

        let transfer = Transfer {
            transaction_id: format!("{}-{}", meta.transaction_hash, meta.log_index),
            source_chain_id,
            target_chain_id,
            native_chain_id: native_asset.chain_id,
            source_asset: event.token.clone(),
            target_asset: native_asset.asset.clone(),
            native_asset: native_asset.asset,
            receiver,
            amount: amount.to_string(),
            timestamp: None,
        };

        info!(
            "[{}] - New Burn Event Log with Amount [{}], Receiver Address [{}] has been found.",
            meta.transaction_hash, event.amount, transfer.receiver
        );

        if self.metrics.is_monitoring_enabled() {
            let labels = self.labels(&transfer);
            if target_chain_id != self.settlement_chain_id {
                self.metrics.create_majority_reached_if_not_exists(&labels);
            } else {
                self.metrics.create_fee_transferred_if_not_exists(&labels);
            }
            self.metrics.create_user_get_his_tokens_if_not_exists(&labels);
        }

        let (topic, message) = self
            .route(meta, transfer, topics::HEDERA_FEE_TRANSFER, topics::READ_ONLY_HEDERA_TRANSFER)
            .await?;
        Ok((Classification::Dispatched(topic), Some(message)))
    }

    async fn handle_mint(&self, meta: &LogMeta, event: MintEvent) -> Result<Classification> {
        info!("[{}] - New Mint Event Log received.", meta.transaction_hash);
        self.track_completion(meta, event.source_chain, &event.token, &event.transaction_id)
            .await
    }

    async fn handle_unlock(&self, meta: &LogMeta, event: UnlockEvent) -> Result<Classification> {
        debug!("[{}] - New Unlock Event Log received.", meta.transaction_hash);
        self.track_completion(meta, event.source_chain, &event.token, &event.transaction_id)
            .await
    }

    // Marks the originating transfer as delivered to its receiver
    async fn track_completion(
        &self,
        meta: &LogMeta,
        source_chain_id: u64,
        token: &str,
        transaction_id: &str,
    ) -> Result<Classification> {
        let target_chain_id = self.client.chain_id().await?;
        let opposite_asset = match self.registry.opposite_asset(source_chain_id, target_chain_id, token) {
            Some(asset) => asset,
            None => return Ok(Classification::Rejected(Rejection::MissingAsset(token.to_string()))),
        };

        if self.metrics.is_monitoring_enabled() {
            self.metrics.set_user_get_his_tokens(&TransferLabels {
                source_chain: source_chain_id,
                target_chain: target_chain_id,
                asset: opposite_asset,
                transaction_id: transaction_id.to_string(),
            });
        }
        debug!("[{}] - Completion tracked for transfer [{}]", meta.transaction_hash, transaction_id);
        Ok(Classification::Tracked)
    }

    // Settlement chain receivers are protobuf account ids; EVM receivers are addresses
    fn decode_receiver(&self, receiver: &[u8], target_chain_id: u64) -> std::result::Result<String, Rejection> {
        if target_chain_id == self.settlement_chain_id {
            decode_account_id(receiver).map_err(|e| Rejection::InvalidReceiver(e.to_string()))
        } else {
            Ok(bytes_to_address(receiver))
        }
    }

    // Converts to the target chain's precision; nothing left after truncation is a rejection
    fn adjust_amount(
        &self,
        amount: &BigUint,
        token: &str,
        source_chain_id: u64,
        target_chain_id: u64,
    ) -> std::result::Result<BigUint, Rejection> {
        let adjusted = self
            .registry
            .adjust_decimals(amount, token, source_chain_id, target_chain_id)
            .map_err(|e| Rejection::DecimalsAdjustment(e.to_string()))?;

        if adjusted == BigUint::from(0u32) {
            return Err(Rejection::InsufficientAmount);
        }
        Ok(adjusted)
    }

    // Live events go to a signing topic; backlog and read-only mode get a timestamp and a read-only topic
    async fn route(
        &self,
        meta: &LogMeta,
        mut transfer: Transfer,
        settlement_topic: &'static str,
        settlement_read_only_topic: &'static str,
    ) -> Result<(&'static str, Message)> {
        let to_settlement = transfer.target_chain_id == self.settlement_chain_id;

        let topic = if self.validator && meta.block_number >= self.live_cutoff {
            if to_settlement {
                settlement_topic
            } else {
                topics::TOPIC_MESSAGE_SUBMISSION
            }
        } else {
            let timestamp = self.client.block_timestamp(meta.block_number).await?;
            transfer.timestamp = Some(timestamp.to_string());
            if to_settlement {
                settlement_read_only_topic
            } else {
                topics::READ_ONLY_TRANSFER_SAVE
            }
        };

        let message = Message {
            topic: topic.to_string(),
            payload: transfer,
        };
        Ok((topic, message))
    }

    fn labels(&self, transfer: &Transfer) -> TransferLabels {
        TransferLabels {
            source_chain: transfer.source_chain_id,
            target_chain: transfer.target_chain_id,
            asset: transfer.source_asset.clone(),
            transaction_id: transfer.transaction_id.clone(),
        }
    }
}

fn rejected(reason: Rejection) -> (Classification, Option<Message>) {
    (Classification::Rejected(reason), None)
}


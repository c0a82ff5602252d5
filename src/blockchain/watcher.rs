use super::classifier::{LogMeta, TransferClassifier};
use super::events::FilterSpec;
use super::fetcher::{ChainClient, LogQuery};
use crate::database::ProgressStore;
use crate::error::Result;
use crate::metrics::{BATCH_PROCESS_TIME, BLOCKS_PROCESSED, LOGS_PROCESSED};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

// Attempts at reading or seeding the watermark before startup gives up
const STARTUP_ATTEMPTS: u32 = 5;

// Startup policy and pacing of one watcher
#[derive(Debug, Clone)]
pub struct WatcherOptions {
    // Forces the watermark, overriding whatever is stored
    pub start_block: Option<u64>,
    pub polling_interval: Duration,
}

// Result of a single poll iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    // No newly confirmed blocks past the watermark
    Idle { from_block: u64 },
    // Range [from_block, to_block] handled and the watermark moved to to_block + 1
    Processed { from_block: u64, to_block: u64, logs: usize },
}

// Durable cursor over one router contract's event stream
pub struct RouterWatcher {
    identity: String,
    client: Arc<dyn ChainClient>,
    progress: Arc<dyn ProgressStore>,
    classifier: TransferClassifier,
    filter: FilterSpec,
    polling_interval: Duration,
    target_block: u64,
}

impl RouterWatcher {
    // Seeds the watermark and fixes the live cutoff; errors here are fatal for this watcher
    pub async fn new(
        identity: &str,
        client: Arc<dyn ChainClient>,
        progress: Arc<dyn ProgressStore>,
        classifier: TransferClassifier,
        filter: FilterSpec,
        options: WatcherOptions,
    ) -> Result<Self> {
        let head = client.block_number().await?;
        let mut target_block = head.saturating_sub(client.block_confirmations());

        let mut attempt = 1;
        loop {
            match init_watermark(identity, progress.as_ref(), options.start_block, target_block).await {
                Ok(()) => break,
                Err(e) if attempt < STARTUP_ATTEMPTS => {
                    warn!(
                        "Watcher [{}] failed to initialise its watermark (attempt {}): {}. Retrying...",
                        identity, attempt, e
                    );
                    attempt += 1;
                    tokio::time::sleep(options.polling_interval).await;
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(start_block) = options.start_block {
            target_block = start_block;
        }

        info!(
            "Watcher [{}] created, live transfers start at block [{}]",
            identity, target_block
        );

        Ok(RouterWatcher {
            identity: identity.to_string(),
            client,
            progress,
            classifier: classifier.with_live_cutoff(target_block),
            filter,
            polling_interval: options.polling_interval,
            target_block,
        })
    }

    // Block from which events are treated as live
    pub fn target_block(&self) -> u64 {
        self.target_block
    }

    // One pass over the next confirmed range; `Err` leaves the watermark untouched
    pub async fn poll_once(&self) -> Result<PollOutcome> {
        let from_block = self.progress.get(&self.identity).await?;
        let head = self.client.block_number().await?;

        let confirmed = match head.checked_sub(self.client.block_confirmations()) {
            Some(confirmed) if from_block <= confirmed => confirmed,
            _ => return Ok(PollOutcome::Idle { from_block }),
        };

        // Provider limit on the span of a single log query
        let to_block = confirmed.min(from_block.saturating_add(self.filter.max_logs_blocks));

        let start_time = Instant::now();
        let logs = self
            .client
            .filter_logs(&LogQuery::new(from_block, to_block, &self.filter))
            .await?;
        debug!(
            "Watcher [{}] fetched [{}] logs for blocks [{}, {}]",
            self.identity,
            logs.len(),
            from_block,
            to_block
        );

        // Nothing is queued until every log in the range has been classified
        let mut pending = Vec::new();
        for log in &logs {
            if log.removed {
                debug!("[{}] - Log [{}] removed by reorg, skipping", log.transaction_hash, log.log_index);
                continue;
            }
            LOGS_PROCESSED.with_label_values(&[self.identity.as_str()]).inc();

            let event = match self.filter.decode(log) {
                Ok(event) => event,
                Err(e) => {
                    error!("[{}] - Failed to decode log [{}]: {}", log.transaction_hash, log.log_index, e);
                    continue;
                }
            };

            let meta = LogMeta {
                transaction_hash: log.transaction_hash.clone(),
                log_index: log.log_index,
                block_number: log.block_number,
            };
            let (_, message) = self.classifier.classify(&meta, event).await?;
            pending.extend(message);
        }
        self.classifier.publish(pending);

        self.progress.update(&self.identity, to_block + 1).await?;

        BLOCKS_PROCESSED
            .with_label_values(&[self.identity.as_str()])
            .inc_by(to_block - from_block + 1);
        BATCH_PROCESS_TIME.observe(start_time.elapsed().as_secs_f64());

        Ok(PollOutcome::Processed {
            from_block,
            to_block,
            logs: logs.len(),
        })
    }

    // Polls until the shutdown flag is raised; errors only delay the next attempt
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Watcher [{}] started", self.identity);

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.poll_once().await {
                Ok(PollOutcome::Processed { from_block, to_block, logs }) => info!(
                    "Watcher [{}] processed blocks [{}, {}] with [{}] logs",
                    self.identity, from_block, to_block, logs
                ),
                Ok(PollOutcome::Idle { from_block }) => {
                    debug!("Watcher [{}] waiting for block [{}]", self.identity, from_block)
                }
                Err(e) => warn!(
                    "Watcher [{}] poll failed: {}. Retrying in {:?}",
                    self.identity, e, self.polling_interval
                ),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.polling_interval) => {}
                changed = shutdown.changed() => {
                    // Sender gone means the process is going down
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Watcher [{}] stopped", self.identity);
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

// Explicit start overrides; otherwise an existing watermark is kept and a missing one seeded
async fn init_watermark(
    identity: &str,
    progress: &dyn ProgressStore,
    start_block: Option<u64>,
    target_block: u64,
) -> Result<()> {
    if let Some(start_block) = start_block {
        info!("Watcher [{}] forced to start at block [{}]", identity, start_block);
        return progress.update(identity, start_block).await;
    }

    match progress.get(identity).await {
        Ok(block) => {
            info!("Watcher [{}] resuming from block [{}]", identity, block);
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            info!("Watcher [{}] has no watermark, starting at block [{}]", identity, target_block);
            progress.create(identity, target_block).await
        }
        Err(e) => Err(e),
    }
}

pub mod classifier;
pub mod contract;
pub mod events;
pub mod fetcher;
pub mod watcher;

pub use classifier::{Classification, LogMeta, Rejection, TransferClassifier};
pub use contract::{MemberRegistry, RouterContract};
pub use events::{FilterSpec, RouterEvent};
pub use fetcher::{ChainClient, EvmRpcClient, LogQuery, RawLog};
pub use watcher::{PollOutcome, RouterWatcher, WatcherOptions};

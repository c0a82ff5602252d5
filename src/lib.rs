pub mod assets;
pub mod blockchain;
pub mod config;
pub mod database;
pub mod error;
pub mod metrics;
pub mod models;
pub mod queue;
pub mod rest;
pub mod transfer;
pub mod utils;

pub use config::Config;
pub use error::{BridgeError, Result};
pub use models::{Transfer, TransferRecord};
pub use rest::AppState;

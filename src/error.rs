use thiserror::Error;

// Errors raised across the watcher, classifier and persistence layers
#[derive(Debug, Error)]
pub enum BridgeError {
    // Chain RPC failure (timeout, transport, JSON-RPC error object)
    #[error("rpc error: {0}")]
    Rpc(String),

    // Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    // Requested row does not exist
    #[error("record not found: {0}")]
    NotFound(String),

    // Status value outside the column's allow-list
    #[error("invalid status [{status}] for column [{column}]")]
    InvalidStatus { column: &'static str, status: String },

    // Status value allowed for the column but not reachable from the stored one
    #[error("invalid transition for column [{column}] from [{from}] to [{to}]")]
    InvalidTransition {
        column: &'static str,
        from: String,
        to: String,
    },

    // Malformed log payload or receiver bytes
    #[error("decode error: {0}")]
    Decode(String),

    // Missing or malformed configuration
    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    // True when the error only signals an absent row
    pub fn is_not_found(&self) -> bool {
        match self {
            BridgeError::NotFound(_) => true,
            BridgeError::Database(sqlx::Error::RowNotFound) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(e: reqwest::Error) -> Self {
        BridgeError::Rpc(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

// REST module exposing transfers and Prometheus metrics
pub mod routes;

pub use routes::{get_transfer, metrics};

use crate::transfer::TransferRepository;

// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub repository: TransferRepository,
}

impl AppState {
    pub fn new(repository: TransferRepository) -> Self {
        AppState { repository }
    }
}

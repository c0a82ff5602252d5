pub mod handler;
pub mod repository;
pub mod state;

pub use handler::TransferHandler;
pub use repository::TransferRepository;
pub use state::{StatusColumn, StatusUpdate};

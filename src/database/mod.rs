pub mod memory;
pub mod progress;
pub mod schema;
pub mod transfers;

pub use memory::{MemoryProgressStore, MemoryTransferStore};
pub use progress::{PgProgressStore, ProgressStore};
pub use transfers::{PgTransferStore, TransferFilter, TransferStore};

//! Show/genre models and the persistence gateway.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use memory::MemoryShowStore;
pub use postgres::PgShowStore;
pub use store::{ChangeSet, CommitSummary, ShowStore};

//! Application services sitting between the web layer and the store.

pub mod shows;

pub use shows::{ShowService, ShowServiceError};

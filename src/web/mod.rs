//! Web API module for the show sync service.

pub mod error;
pub mod middleware;
pub mod routes;
pub mod shows;
pub mod status;

pub use routes::*;

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod data;
pub mod ingest;
pub mod logging;
pub mod services;
pub mod state;
pub mod utils;
pub mod web;

//! CLI command implementations

pub mod config;
pub mod datasets;
pub mod evaluate;
pub mod generations;
pub mod label;
pub mod models;
pub mod ping;

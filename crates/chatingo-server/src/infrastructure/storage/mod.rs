//! Storage adapters: TOML configuration.

pub mod config;

pub use config::{load_config, ServerConfig};

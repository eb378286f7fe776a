//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (batch size, worker count, cache retention, etc.)
//! - CLI option types and parsing

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{
    CacheBackend, Cli, Command, GatewayConfig, LoadConfig, LogFormat, LogLevel, RunsConfig,
    StoreBackend,
};

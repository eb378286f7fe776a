//! Application initialization and resource setup.
//!
//! This module provides functions to initialize the shared resources of a load:
//! - Logger
//! - Deduplication cache backend
//! - Durable store backend (database pool and migrations)

mod backends;
mod logger;

pub use backends::{init_cache, init_store, open_sqlite_store, StoreHandles};
pub use logger::init_logger_with;

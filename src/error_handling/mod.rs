//! Error handling and failure statistics.
//!
//! This module provides:
//! - Error type definitions for sources, caches, stores and initialization
//! - The `ErrorType` taxonomy of counted (non-fatal) failures
//! - Per-stage failure counters
//!
//! Only startup failures are fatal. Everything a running stage encounters is
//! counted under an `ErrorType` and the load carries on.

mod stats;
mod types;

// Re-export public API
pub use stats::ErrorCounts;
pub use types::{
    CacheError, DatabaseError, ErrorType, InitializationError, SourceError, StoreError,
};

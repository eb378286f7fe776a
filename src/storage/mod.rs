//! Durable record stores.
//!
//! `RecordStore` is the bulk-insert sink used by the persistence workers;
//! `RecordSearch` is the point lookup used by the gateway. Stores must accept
//! concurrent `insert` calls from every worker and must tolerate records whose
//! key is already stored.

mod memory;
pub mod migrations;
pub mod pool;
pub mod run;
mod sqlite;
#[cfg(test)]
pub(crate) mod test_helpers;

use async_trait::async_trait;

use crate::error_handling::StoreError;
use crate::models::GeoRecord;

pub use memory::InMemoryStore;
pub use migrations::run_migrations;
pub use pool::init_db_pool_with_path;
pub use run::{insert_run_metadata, query_run_history, update_run_stats, RunMetadata, RunStats, RunSummary};
pub use sqlite::SqliteStore;

/// Bulk-insert sink keyed by record IP.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts `records` and returns how many were actually written.
    ///
    /// Records whose IP is already stored are skipped, so the count may be
    /// lower than `records.len()`.
    async fn insert(&self, records: &[GeoRecord]) -> Result<usize, StoreError>;
}

/// Point lookup by IP.
#[async_trait]
pub trait RecordSearch: Send + Sync {
    /// Returns the record stored under `ip`, or `None` when it is unknown.
    async fn by_ip(&self, ip: &str) -> Result<Option<GeoRecord>, StoreError>;
}

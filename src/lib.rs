//! geo_loader library: bulk import of geo-IP records
//!
//! This library streams geo-IP records from a CSV file, drops malformed,
//! invalid and duplicate entries (within a run and across runs, through a
//! pluggable cache) and bulk-inserts the rest into a store with a pool of
//! concurrent workers.
//!
//! # Example
//!
//! ```no_run
//! use geo_loader::{run_load, LoadConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LoadConfig {
//!     file: std::path::PathBuf::from("data_dump.csv"),
//!     workers: 8,
//!     ..Default::default()
//! };
//!
//! let summary = run_load(config, CancellationToken::new()).await?;
//! println!("Stored {} of {} records",
//!          summary.report.stored(), summary.report.total_records());
//! # Ok(())
//! # }
//! ```
//!
//! The pipeline can also be assembled from its parts: any `RecordSource`,
//! `DedupCache` and `RecordStore` can be handed to a `Loader`.
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

#![warn(missing_docs)]

mod app;
pub mod cache;
pub mod config;
pub mod error_handling;
pub mod gateway;
pub mod initialization;
pub mod models;
pub mod pipeline;
mod run;
pub mod source;
pub mod storage;

// Re-export public API
pub use app::cancel_on_ctrl_c;
pub use cache::{DedupCache, InMemoryCache, RedisCache, RedisCacheConfig};
pub use config::{
    CacheBackend, Cli, Command, GatewayConfig, LoadConfig, LogFormat, LogLevel, RunsConfig,
    StoreBackend,
};
pub use error_handling::{CacheError, ErrorCounts, ErrorType, SourceError, StoreError};
pub use models::{Batch, GeoRecord};
pub use pipeline::{LoadProgress, LoadReport, Loader, LoaderConfig};
pub use run::{run_gateway, run_history, run_load, LoadSummary};
pub use source::{CsvSource, Imported, InMemorySource, RecordSource};
pub use storage::{
    query_run_history, run_migrations, InMemoryStore, RecordSearch, RecordStore, RunSummary,
    SqliteStore,
};

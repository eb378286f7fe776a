//! Pipeline orchestrator.
//!
//! Wires source -> deduplication -> persistence fan-out under one
//! cancellation token and waits for every worker to drain.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info};
use tokio_util::sync::CancellationToken;

use crate::cache::DedupCache;
use crate::config::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_WORKERS};
use crate::error_handling::{ErrorCounts, SourceError};
use crate::pipeline::dedup::{DedupStage, DedupStats};
use crate::pipeline::persist::{PersistFanOut, PersistStats};
use crate::pipeline::progress::LoadProgress;
use crate::source::RecordSource;
use crate::storage::RecordStore;

/// Concurrency settings of a load.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Number of store workers
    pub workers: usize,
    /// Capacity of the cleaned-batch channel
    pub channel_capacity: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Deduplication stage counters
    pub dedup: DedupStats,
    /// Store worker counters
    pub persist: PersistStats,
    /// Wall time of the whole run
    pub elapsed: Duration,
    /// Whether the cancellation token fired during the run
    pub cancelled: bool,
}

impl LoadReport {
    /// Failure counts of every stage, merged.
    pub fn errors(&self) -> ErrorCounts {
        let mut errors = self.dedup.errors.clone();
        errors.merge(&self.persist.errors);
        errors
    }

    /// Records received from the source.
    pub fn total_records(&self) -> usize {
        self.dedup.records_seen
    }

    /// Records forwarded to the store after deduplication.
    pub fn accepted(&self) -> usize {
        self.dedup.accepted
    }

    /// Records the store reported as inserted.
    pub fn stored(&self) -> usize {
        self.persist.stored
    }

    /// Throughput over every record read from the source.
    pub fn records_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.dedup.records_seen as f64 / secs
        } else {
            0.0
        }
    }
}

/// Runs a source through deduplication into a store.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use geo_loader::{InMemoryCache, InMemorySource, InMemoryStore, Loader, LoaderConfig};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let loader = Loader::new(
///     Arc::new(InMemorySource::default()),
///     Arc::new(InMemoryCache::new()),
///     Arc::new(InMemoryStore::new()),
///     LoaderConfig::default(),
/// );
/// let report = loader.load(CancellationToken::new()).await?;
/// println!("stored {} records", report.stored());
/// # Ok(())
/// # }
/// ```
pub struct Loader {
    source: Arc<dyn RecordSource>,
    cache: Arc<dyn DedupCache>,
    store: Arc<dyn RecordStore>,
    config: LoaderConfig,
    progress: Arc<LoadProgress>,
}

impl Loader {
    /// Wires a source, cache and store into a loader.
    pub fn new(
        source: Arc<dyn RecordSource>,
        cache: Arc<dyn DedupCache>,
        store: Arc<dyn RecordStore>,
        config: LoaderConfig,
    ) -> Self {
        Loader {
            source,
            cache,
            store,
            config,
            progress: Arc::new(LoadProgress::new()),
        }
    }

    /// Live counters updated while `load` runs.
    pub fn progress(&self) -> Arc<LoadProgress> {
        Arc::clone(&self.progress)
    }

    /// Runs the pipeline to completion or cancellation.
    ///
    /// Only a failure to start the source is returned as an error; everything
    /// that goes wrong afterwards is counted in the report.
    pub async fn load(&self, cancel: CancellationToken) -> Result<LoadReport, SourceError> {
        let started = Instant::now();
        let imported = self.source.import(cancel.clone()).await?;

        let (cleaned, dedup_handle) =
            DedupStage::new(Arc::clone(&self.cache), self.config.channel_capacity)
                .with_progress(Arc::clone(&self.progress))
                .spawn(imported, cancel.clone());

        let persist = PersistFanOut::new(Arc::clone(&self.store), self.config.workers)
            .with_progress(Arc::clone(&self.progress))
            .spawn(cleaned, cancel.clone())
            .join()
            .await;

        let dedup = match dedup_handle.await {
            Ok(stats) => stats,
            Err(e) => {
                error!("Deduplication stage failed: {e}");
                DedupStats::default()
            }
        };

        let report = LoadReport {
            dedup,
            persist,
            elapsed: started.elapsed(),
            cancelled: cancel.is_cancelled(),
        };
        info!(
            "Load {}: {} records, {} imported, {} skipped, {} stored in {:.2}s (~{:.0} records/sec)",
            if report.cancelled { "cancelled" } else { "finished" },
            report.total_records(),
            report.accepted(),
            report.dedup.skipped(),
            report.stored(),
            report.elapsed.as_secs_f64(),
            report.records_per_second()
        );
        Ok(report)
    }
}

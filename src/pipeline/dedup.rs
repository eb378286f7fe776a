//! Deduplication stage.
//!
//! Reads raw batches in order, drops invalid records and repeats (within the
//! batch and against the cache), commits the survivors' keys to the cache and
//! emits the cleaned batch downstream. A batch's cache commit runs in the
//! background while the batch is emitted and the next one is validated; it is
//! settled before the next cache lookup. Emission order always matches input
//! order.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::cache::DedupCache;
use crate::error_handling::{ErrorCounts, ErrorType};
use crate::models::{Batch, GeoRecord};
use crate::pipeline::progress::LoadProgress;
use crate::source::Imported;

/// Counters owned by the deduplication stage.
#[derive(Debug, Clone, Default)]
pub struct DedupStats {
    /// Raw batches received from the source
    pub batches: usize,
    /// Records received from the source
    pub records_seen: usize,
    /// Records forwarded to the store workers
    pub accepted: usize,
    /// Records dropped as repeats, within a batch or already cached
    pub duplicates: usize,
    /// Failures counted by this stage
    pub errors: ErrorCounts,
    /// Wall time of the stage
    pub elapsed: Duration,
    /// Whether the stage stopped on cancellation
    pub cancelled: bool,
}

impl DedupStats {
    /// Records received but not forwarded, for any reason.
    pub fn skipped(&self) -> usize {
        self.records_seen.saturating_sub(self.accepted)
    }

    /// Throughput over every record received.
    pub fn records_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.records_seen as f64 / secs
        } else {
            0.0
        }
    }

    /// Logs the end-of-stage summary line.
    pub fn log_summary(&self) {
        info!(
            "Deduplication finished: {} records, {} accepted, {} skipped ({} duplicates, {} errors) in {:.2}s (~{:.0} records/sec)",
            self.records_seen,
            self.accepted,
            self.skipped(),
            self.duplicates,
            self.errors.total(),
            self.elapsed.as_secs_f64(),
            self.records_per_second()
        );
    }
}

/// Result of validating and collapsing one raw batch.
#[derive(Debug, Default, PartialEq)]
pub struct PreparedBatch {
    /// First occurrence of each valid key, in input order
    pub records: Vec<GeoRecord>,
    /// Records with a blank key
    pub invalid: usize,
    /// Repeats of a key earlier in the batch
    pub duplicates: usize,
}

/// Drops invalid records and keeps the first occurrence of each key.
pub fn prepare_batch(batch: Batch) -> PreparedBatch {
    let mut prepared = PreparedBatch {
        records: Vec::with_capacity(batch.len()),
        ..Default::default()
    };
    let mut seen: HashSet<String> = HashSet::with_capacity(batch.len());

    for record in batch {
        if !record.is_valid() {
            prepared.invalid += 1;
            continue;
        }
        if !seen.insert(record.ip.clone()) {
            prepared.duplicates += 1;
            continue;
        }
        prepared.records.push(record);
    }
    prepared
}

/// Single-reader deduplication stage.
pub struct DedupStage {
    cache: Arc<dyn DedupCache>,
    channel_capacity: usize,
    progress: Arc<LoadProgress>,
}

impl DedupStage {
    /// Stage reading through `cache`; `channel_capacity` bounds its output channel.
    pub fn new(cache: Arc<dyn DedupCache>, channel_capacity: usize) -> Self {
        DedupStage {
            cache,
            channel_capacity: channel_capacity.max(1),
            progress: Arc::new(LoadProgress::new()),
        }
    }

    /// Reports live counts to `progress` instead of a private counter.
    pub fn with_progress(mut self, progress: Arc<LoadProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Starts the stage; returns the cleaned-batch channel and the stage's task.
    pub fn spawn(
        self,
        imported: Imported,
        cancel: CancellationToken,
    ) -> (mpsc::Receiver<Batch>, JoinHandle<DedupStats>) {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let handle = tokio::spawn(self.run(imported, tx, cancel));
        (rx, handle)
    }

    async fn run(
        self,
        imported: Imported,
        tx: mpsc::Sender<Batch>,
        cancel: CancellationToken,
    ) -> DedupStats {
        let started = Instant::now();
        let mut stats = DedupStats::default();
        let mut commits: JoinSet<usize> = JoinSet::new();
        let Imported {
            mut batches,
            mut errors,
        } = imported;
        let mut errors_open = true;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return self.abort(stats, commits, started, &cancel);
                }
                error = errors.recv(), if errors_open => match error {
                    Some(e) => {
                        debug!("Malformed record: {e}");
                        stats.errors.increment(ErrorType::MalformedRecord);
                    }
                    None => errors_open = false,
                },
                batch = batches.recv() => match batch {
                    Some(batch) => {
                        if !self.process(batch, &tx, &mut commits, &mut stats, &cancel).await {
                            return self.abort(stats, commits, started, &cancel);
                        }
                    }
                    None => break,
                },
            }
        }

        // The source closes both channels together; pick up errors still buffered.
        while let Ok(e) = errors.try_recv() {
            debug!("Malformed record: {e}");
            stats.errors.increment(ErrorType::MalformedRecord);
        }

        if !settle_commits(&mut commits, &mut stats, &cancel).await {
            return self.abort(stats, commits, started, &cancel);
        }

        stats.elapsed = started.elapsed();
        stats.log_summary();
        // Dropping `tx` here closes the cleaned-batch channel.
        stats
    }

    /// Handles one raw batch. Returns `false` when the stage must stop.
    async fn process(
        &self,
        batch: Batch,
        tx: &mpsc::Sender<Batch>,
        commits: &mut JoinSet<usize>,
        stats: &mut DedupStats,
        cancel: &CancellationToken,
    ) -> bool {
        stats.batches += 1;
        stats.records_seen += batch.len();
        self.progress.add_seen(batch.len());

        let prepared = prepare_batch(batch);
        stats.errors.add(ErrorType::InvalidRecord, prepared.invalid);
        stats.duplicates += prepared.duplicates;
        if prepared.records.is_empty() {
            return true;
        }

        // Keys committed for the previous batch must be visible to this lookup.
        if !settle_commits(commits, stats, cancel).await {
            return false;
        }

        let keys: Vec<String> = prepared.records.iter().map(|r| r.ip.clone()).collect();
        let lookup = tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            lookup = self.cache.get(&keys) => lookup,
        };
        let known: HashSet<String> = match lookup {
            Ok(known) => known.into_iter().collect(),
            Err(e) => {
                warn!("Cache lookup failed, dropping batch of {} records: {e}", keys.len());
                stats.errors.add(ErrorType::CacheReadFailure, keys.len());
                return true;
            }
        };

        let candidates = prepared.records.len();
        let cleaned: Batch = prepared
            .records
            .into_iter()
            .filter(|record| !known.contains(&record.ip))
            .collect();
        stats.duplicates += candidates - cleaned.len();
        if cleaned.is_empty() {
            return true;
        }

        let commit_keys: HashSet<String> = cleaned.iter().map(|r| r.ip.clone()).collect();
        let cache = Arc::clone(&self.cache);
        commits.spawn(async move {
            match cache.store(&commit_keys).await {
                Ok(()) => 0,
                Err(e) => {
                    warn!("Cache commit of {} keys failed: {e}", commit_keys.len());
                    commit_keys.len()
                }
            }
        });

        let accepted = cleaned.len();
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            sent = tx.send(cleaned) => sent.is_ok(),
        };
        if sent {
            stats.accepted += accepted;
            self.progress.add_accepted(accepted);
        }
        sent
    }

    fn abort(
        &self,
        mut stats: DedupStats,
        mut commits: JoinSet<usize>,
        started: Instant,
        cancel: &CancellationToken,
    ) -> DedupStats {
        commits.abort_all();
        stats.cancelled = cancel.is_cancelled();
        if !stats.cancelled {
            warn!("Store workers stopped receiving; ending deduplication early");
        }
        stats.elapsed = started.elapsed();
        debug!(
            "Deduplication stopped after {} batches ({} records accepted)",
            stats.batches, stats.accepted
        );
        stats
    }
}

/// Waits for outstanding cache commits. Returns `false` if cancelled first.
async fn settle_commits(
    commits: &mut JoinSet<usize>,
    stats: &mut DedupStats,
    cancel: &CancellationToken,
) -> bool {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return false,
            result = commits.join_next() => match result {
                Some(result) => record_commit(result, stats),
                None => return true,
            },
        }
    }
}

fn record_commit(result: Result<usize, tokio::task::JoinError>, stats: &mut DedupStats) {
    match result {
        Ok(failed) => stats.errors.add(ErrorType::CacheWriteFailure, failed),
        Err(e) if e.is_cancelled() => {}
        Err(e) => warn!("Cache commit task failed: {e}"),
    }
}

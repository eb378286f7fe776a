//! Persistence fan-out.
//!
//! A fixed pool of workers pulls cleaned batches from one shared queue and
//! bulk-inserts each into the store. Every batch goes to exactly one worker;
//! ordering across workers is not preserved.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error_handling::{ErrorCounts, ErrorType};
use crate::models::Batch;
use crate::pipeline::progress::LoadProgress;
use crate::storage::RecordStore;

/// Counters owned by one persistence worker.
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    /// Index of the worker within the fan-out
    pub worker_id: usize,
    /// Batches taken from the queue
    pub batches: usize,
    /// Records handed to the store
    pub records: usize,
    /// Records the store reported as inserted
    pub stored: usize,
    /// Failures counted by this worker
    pub errors: ErrorCounts,
}

/// Aggregate of every worker's counters, built once all workers have exited.
#[derive(Debug, Clone, Default)]
pub struct PersistStats {
    /// Workers that exited cleanly
    pub workers: usize,
    /// Batches handled across all workers
    pub batches: usize,
    /// Records handed to the store
    pub records: usize,
    /// Records the store reported as inserted
    pub stored: usize,
    /// Failures of every worker, merged
    pub errors: ErrorCounts,
    /// Time from spawn until the last worker exited
    pub elapsed: Duration,
}

impl PersistStats {
    /// Sums per-worker counters.
    pub fn from_workers(workers: &[WorkerStats], elapsed: Duration) -> Self {
        let mut stats = PersistStats {
            workers: workers.len(),
            elapsed,
            ..Default::default()
        };
        for worker in workers {
            stats.batches += worker.batches;
            stats.records += worker.records;
            stats.stored += worker.stored;
            stats.errors.merge(&worker.errors);
        }
        stats
    }

    /// Records handed to the store but not inserted.
    pub fn failed(&self) -> usize {
        self.errors.get(ErrorType::StoreInsertFailure)
    }

    /// Logs the end-of-stage summary line.
    pub fn log_summary(&self) {
        info!(
            "Store finished: {} records to store, {} stored, {} failed across {} workers in {:.2}s",
            self.records,
            self.stored,
            self.failed(),
            self.workers,
            self.elapsed.as_secs_f64()
        );
    }
}

/// Pool of store workers sharing one input queue.
pub struct PersistFanOut {
    store: Arc<dyn RecordStore>,
    workers: usize,
    progress: Arc<LoadProgress>,
}

/// Running workers of a `PersistFanOut`.
pub struct FanOutHandle {
    handles: Vec<JoinHandle<WorkerStats>>,
    started: Instant,
}

impl PersistFanOut {
    /// Fan-out of `workers` tasks (at least one) writing to `store`.
    pub fn new(store: Arc<dyn RecordStore>, workers: usize) -> Self {
        PersistFanOut {
            store,
            workers: workers.max(1),
            progress: Arc::new(LoadProgress::new()),
        }
    }

    /// Reports live counts to `progress` instead of a private counter.
    pub fn with_progress(mut self, progress: Arc<LoadProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Starts exactly `workers` tasks draining `batches`.
    pub fn spawn(self, batches: mpsc::Receiver<Batch>, cancel: CancellationToken) -> FanOutHandle {
        let queue = Arc::new(Mutex::new(batches));
        let handles = (0..self.workers)
            .map(|worker_id| {
                tokio::spawn(persist_worker(
                    worker_id,
                    Arc::clone(&self.store),
                    Arc::clone(&queue),
                    cancel.clone(),
                    Arc::clone(&self.progress),
                ))
            })
            .collect();

        debug!("Started {} store workers", self.workers);
        FanOutHandle {
            handles,
            started: Instant::now(),
        }
    }
}

impl FanOutHandle {
    /// Waits for every worker to exit and aggregates their counters.
    pub async fn join(self) -> PersistStats {
        let mut pending: FuturesUnordered<_> = self.handles.into_iter().collect();
        let mut finished = Vec::with_capacity(pending.len());

        while let Some(result) = pending.next().await {
            match result {
                Ok(stats) => finished.push(stats),
                Err(e) => error!("Store worker failed: {e}"),
            }
        }

        let stats = PersistStats::from_workers(&finished, self.started.elapsed());
        stats.log_summary();
        stats
    }
}

async fn persist_worker(
    worker_id: usize,
    store: Arc<dyn RecordStore>,
    queue: Arc<Mutex<mpsc::Receiver<Batch>>>,
    cancel: CancellationToken,
    progress: Arc<LoadProgress>,
) -> WorkerStats {
    let mut stats = WorkerStats {
        worker_id,
        ..Default::default()
    };

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = async { queue.lock().await.recv().await } => next,
        };
        let Some(batch) = next else {
            break;
        };
        if cancel.is_cancelled() {
            break;
        }

        stats.batches += 1;
        stats.records += batch.len();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = store.insert(&batch) => result,
        };
        match result {
            Ok(inserted) => {
                stats.stored += inserted;
                progress.add_stored(inserted);
                if inserted < batch.len() {
                    stats
                        .errors
                        .add(ErrorType::StoreInsertFailure, batch.len() - inserted);
                }
            }
            Err(e) => {
                warn!(
                    "Worker {worker_id}: insert of {} records failed: {e}",
                    batch.len()
                );
                stats.errors.add(ErrorType::StoreInsertFailure, batch.len());
            }
        }
    }

    debug!(
        "Worker {worker_id} exiting after {} batches ({} records stored)",
        stats.batches, stats.stored
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::StoreError;
    use crate::models::GeoRecord;
    use crate::storage::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingStore;

    #[async_trait]
    impl RecordStore for FailingStore {
        async fn insert(&self, _records: &[GeoRecord]) -> Result<usize, StoreError> {
            Err(StoreError::Unavailable("insert disabled".to_string()))
        }
    }

    /// Counts calls and records which batches it saw.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RecordStore for CountingStore {
        async fn insert(&self, records: &[GeoRecord]) -> Result<usize, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.inner.insert(records).await
        }
    }

    async fn feed(batches: Vec<Batch>) -> mpsc::Receiver<Batch> {
        let (tx, rx) = mpsc::channel(batches.len().max(1));
        for batch in batches {
            tx.send(batch).await.expect("send batch");
        }
        rx
    }

    fn batches(count: usize, size: usize) -> Vec<Batch> {
        (0..count)
            .map(|b| {
                (0..size)
                    .map(|r| GeoRecord::with_ip(format!("10.0.{b}.{r}")))
                    .collect()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_fan_out_stores_every_batch_exactly_once() {
        let store = Arc::new(CountingStore::default());
        let rx = feed(batches(12, 3)).await;

        let stats = PersistFanOut::new(store.clone(), 4)
            .spawn(rx, CancellationToken::new())
            .join()
            .await;

        assert_eq!(stats.workers, 4);
        assert_eq!(stats.batches, 12);
        assert_eq!(stats.records, 36);
        assert_eq!(stats.stored, 36);
        assert_eq!(stats.failed(), 0);
        assert_eq!(store.calls.load(Ordering::SeqCst), 12);
        assert_eq!(store.inner.len().await, 36);
    }

    #[tokio::test]
    async fn test_store_errors_are_counted_per_record() {
        let rx = feed(batches(2, 4)).await;
        let stats = PersistFanOut::new(Arc::new(FailingStore), 2)
            .spawn(rx, CancellationToken::new())
            .join()
            .await;

        assert_eq!(stats.stored, 0);
        assert_eq!(stats.failed(), 8);
    }

    #[tokio::test]
    async fn test_partial_insert_counts_shortfall() {
        let store = Arc::new(InMemoryStore::new());
        store
            .insert(&[GeoRecord::with_ip("10.0.0.0")])
            .await
            .expect("seed store");

        let rx = feed(batches(1, 3)).await;
        let stats = PersistFanOut::new(store, 1)
            .spawn(rx, CancellationToken::new())
            .join()
            .await;

        assert_eq!(stats.stored, 2);
        assert_eq!(stats.failed(), 1);
    }

    #[tokio::test]
    async fn test_workers_exit_on_cancel_with_open_queue() {
        let (_tx, rx) = mpsc::channel::<Batch>(1);
        let cancel = CancellationToken::new();
        let handle = PersistFanOut::new(Arc::new(InMemoryStore::new()), 3).spawn(rx, cancel.clone());

        cancel.cancel();
        let stats = tokio::time::timeout(Duration::from_secs(5), handle.join())
            .await
            .expect("workers should exit promptly");
        assert_eq!(stats.workers, 3);
        assert_eq!(stats.batches, 0);
    }
}

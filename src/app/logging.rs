//! Progress logging utilities.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::pipeline::LoadProgress;

/// Logs one progress line for a running load.
pub fn log_progress(start_time: Instant, progress: &LoadProgress) {
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    let seen = progress.seen();
    let rate = if elapsed_secs > 0.0 {
        seen as f64 / elapsed_secs
    } else {
        0.0
    };
    info!(
        "Processed {} records ({} accepted, {} stored) in {:.2} seconds (~{:.2} records/sec)",
        seen,
        progress.accepted(),
        progress.stored(),
        elapsed_secs,
        rate
    );
}

/// Logs progress every `interval` until `cancel` fires.
pub fn spawn_progress_logger(
    progress: Arc<LoadProgress>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let start_time = Instant::now();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => log_progress(start_time, &progress),
            }
        }
    })
}

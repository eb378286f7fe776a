//! Live counters shared between the pipeline stages and the progress logger.
//!
//! Stage statistics stay local to their stage; these atomics only mirror the
//! totals so a running load can be observed.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Running totals of a load.
#[derive(Debug, Default)]
pub struct LoadProgress {
    seen: AtomicUsize,
    accepted: AtomicUsize,
    stored: AtomicUsize,
}

impl LoadProgress {
    /// Counters starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_seen(&self, count: usize) {
        self.seen.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn add_accepted(&self, count: usize) {
        self.accepted.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn add_stored(&self, count: usize) {
        self.stored.fetch_add(count, Ordering::Relaxed);
    }

    /// Records received by the deduplication stage so far.
    pub fn seen(&self) -> usize {
        self.seen.load(Ordering::Relaxed)
    }

    /// Records forwarded to the store workers so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Records written by the store so far.
    pub fn stored(&self) -> usize {
        self.stored.load(Ordering::Relaxed)
    }
}

//! Per-stage failure counters.
//!
//! Each pipeline stage owns its own `ErrorCounts` and mutates it without
//! synchronization. The orchestrator merges the stage counters once every
//! stage has been joined.

use std::collections::HashMap;
use strum::IntoEnumIterator;

use super::types::ErrorType;

/// Record-level failure counts keyed by `ErrorType`.
///
/// All error types are initialized to zero on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCounts {
    counts: HashMap<ErrorType, usize>,
}

impl ErrorCounts {
    /// Creates empty counts.
    pub fn new() -> Self {
        let counts = ErrorType::iter().map(|error| (error, 0)).collect();
        ErrorCounts { counts }
    }

    /// Adds `count` records to an error counter.
    pub fn add(&mut self, error: ErrorType, count: usize) {
        *self.counts.entry(error).or_insert(0) += count;
    }

    /// Increments an error counter by one record.
    pub fn increment(&mut self, error: ErrorType) {
        self.add(error, 1);
    }

    /// Gets the count for an error type.
    pub fn get(&self, error: ErrorType) -> usize {
        self.counts.get(&error).copied().unwrap_or(0)
    }

    /// Total records counted across all error types.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Folds another stage's counters into this one.
    pub fn merge(&mut self, other: &ErrorCounts) {
        for (error, count) in &other.counts {
            self.add(*error, *count);
        }
    }
}

impl Default for ErrorCounts {
    fn default() -> Self {
        Self::new()
    }
}

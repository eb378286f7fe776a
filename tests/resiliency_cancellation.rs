//! Cancellation behaviour of the pipeline.
//!
//! A fired token must stop every stage promptly, without deadlock, leaving
//! the remaining batches unprocessed.

mod helpers;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use geo_loader::{InMemoryCache, InMemorySource, Loader, LoaderConfig};
use helpers::{records, CancellingStore};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_cancel_after_first_batch_stops_pipeline() {
    let cancel = CancellationToken::new();
    let store = Arc::new(CancellingStore::new(cancel.clone()));
    let loader = Loader::new(
        Arc::new(InMemorySource::new(records(3), 1)),
        Arc::new(InMemoryCache::new()),
        store.clone(),
        LoaderConfig {
            workers: 1,
            channel_capacity: 1,
        },
    );

    let report = timeout(Duration::from_secs(5), loader.load(cancel.clone()))
        .await
        .expect("pipeline should not deadlock")
        .expect("load should start");

    assert!(report.cancelled);
    assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    assert_eq!(store.inner.len().await, 1);
    assert_eq!(report.stored(), 1);
}

#[tokio::test]
async fn test_cancel_before_start_processes_nothing() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let store = Arc::new(CancellingStore::new(CancellationToken::new()));
    let loader = Loader::new(
        Arc::new(InMemorySource::new(records(100), 10)),
        Arc::new(InMemoryCache::new()),
        store.clone(),
        LoaderConfig::default(),
    );

    let report = timeout(Duration::from_secs(5), loader.load(cancel))
        .await
        .expect("pipeline should not deadlock")
        .expect("load should start");

    assert!(report.cancelled);
    assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancel_mid_stream_with_many_workers() {
    let cancel = CancellationToken::new();
    let store = Arc::new(CancellingStore::new(cancel.clone()));
    let loader = Loader::new(
        Arc::new(InMemorySource::new(records(10_000), 10)),
        Arc::new(InMemoryCache::new()),
        store.clone(),
        LoaderConfig {
            workers: 8,
            channel_capacity: 1,
        },
    );

    let report = timeout(Duration::from_secs(10), loader.load(cancel))
        .await
        .expect("pipeline should not deadlock")
        .expect("load should start");

    assert!(report.cancelled);
    assert!(store.inner.len().await < 10_000);
    assert!(report.stored() <= report.accepted());
}

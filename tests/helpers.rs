// Shared test helpers for building pipelines and test data.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

use geo_loader::{
    CacheError, DedupCache, GeoRecord, InMemoryCache, InMemoryStore, RecordStore, StoreError,
};

/// Creates a record with every field populated.
#[allow(dead_code)] // Used by other test files
pub fn record(ip: &str) -> GeoRecord {
    GeoRecord {
        ip: ip.to_string(),
        country_code: "SI".to_string(),
        country: "Nepal".to_string(),
        city: "DuBuquemouth".to_string(),
        latitude: -84.875,
        longitude: 7.206,
        mystery_value: 7823011346,
    }
}

/// Creates `count` records with distinct IPs.
#[allow(dead_code)]
pub fn records(count: usize) -> Vec<GeoRecord> {
    (0..count)
        .map(|i| record(&format!("10.{}.{}.{}", i / 65536, (i / 256) % 256, i % 256)))
        .collect()
}

/// Writes a CSV file with a header row and the given data rows.
#[allow(dead_code)]
pub fn write_csv(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    writeln!(
        file,
        "ip_address,country_code,country,city,latitude,longitude,mystery_value"
    )
    .expect("Failed to write header");
    for row in rows {
        writeln!(file, "{row}").expect("Failed to write row");
    }
    file.flush().expect("Failed to flush CSV");
    file
}

/// Formats a record as a CSV row.
#[allow(dead_code)]
pub fn csv_row(record: &GeoRecord) -> String {
    format!(
        "{},{},{},{},{},{},{}",
        record.ip,
        record.country_code,
        record.country,
        record.city,
        record.latitude,
        record.longitude,
        record.mystery_value
    )
}

/// Returns whether `path` exists, for readability in assertions.
#[allow(dead_code)]
pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// Cache whose lookups always fail.
#[allow(dead_code)]
pub struct UnreachableCache;

#[async_trait]
impl DedupCache for UnreachableCache {
    async fn get(&self, _keys: &[String]) -> Result<Vec<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn store(&self, _keys: &HashSet<String>) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

/// In-memory cache that counts calls.
#[allow(dead_code)]
#[derive(Default)]
pub struct CountingCache {
    pub inner: InMemoryCache,
    pub gets: AtomicUsize,
    pub stores: AtomicUsize,
}

#[async_trait]
impl DedupCache for CountingCache {
    async fn get(&self, keys: &[String]) -> Result<Vec<String>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(keys).await
    }

    async fn store(&self, keys: &HashSet<String>) -> Result<(), CacheError> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        self.inner.store(keys).await
    }
}

/// Store that fires a cancellation token on its first insert.
#[allow(dead_code)]
pub struct CancellingStore {
    pub inner: InMemoryStore,
    pub cancel: CancellationToken,
    pub inserts: AtomicUsize,
    fired: AtomicBool,
}

#[allow(dead_code)]
impl CancellingStore {
    pub fn new(cancel: CancellationToken) -> Self {
        CancellingStore {
            inner: InMemoryStore::new(),
            cancel,
            inserts: AtomicUsize::new(0),
            fired: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl RecordStore for CancellingStore {
    async fn insert(&self, records: &[GeoRecord]) -> Result<usize, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let inserted = self.inner.insert(records).await?;
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.cancel.cancel();
        }
        Ok(inserted)
    }
}

/// Store that rejects every insert.
#[allow(dead_code)]
pub struct RejectingStore;

#[async_trait]
impl RecordStore for RejectingStore {
    async fn insert(&self, _records: &[GeoRecord]) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }
}

/// Shorthand for an `Arc`'d in-memory store.
#[allow(dead_code)]
pub fn memory_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new())
}

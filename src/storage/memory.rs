//! In-memory record store, used for tests and dry runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RecordSearch, RecordStore};
use crate::error_handling::StoreError;
use crate::models::GeoRecord;

#[derive(Debug, Default)]
struct Inner {
    records: Vec<GeoRecord>,
    by_ip: HashMap<String, usize>,
}

/// Insertion-ordered list of records, unique by IP.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    /// Whether nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of every stored record in insertion order.
    pub async fn records(&self) -> Vec<GeoRecord> {
        self.inner.read().await.records.clone()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn insert(&self, records: &[GeoRecord]) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().await;
        let mut inserted = 0;
        for record in records {
            if inner.by_ip.contains_key(&record.ip) {
                continue;
            }
            let index = inner.records.len();
            inner.by_ip.insert(record.ip.clone(), index);
            inner.records.push(record.clone());
            inserted += 1;
        }
        Ok(inserted)
    }
}

#[async_trait]
impl RecordSearch for InMemoryStore {
    async fn by_ip(&self, ip: &str) -> Result<Option<GeoRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.by_ip.get(ip).map(|&index| inner.records[index].clone()))
    }
}

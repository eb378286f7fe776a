//! In-process deduplication cache.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::DedupCache;
use crate::error_handling::CacheError;

/// Map size below which expired keys are never swept.
const MIN_SWEEP_LEN: usize = 1024;

/// Map-backed cache living for the duration of the process.
///
/// Keys never expire unless a TTL is configured. Expired keys are ignored by
/// lookups and swept out once the map has doubled since the previous sweep.
#[derive(Debug)]
pub struct InMemoryCache {
    /// Key -> expiry deadline (`None` = no expiry)
    items: RwLock<HashMap<String, Option<Instant>>>,
    ttl: Option<Duration>,
    /// Map length that triggers the next sweep
    sweep_at: AtomicUsize,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        InMemoryCache {
            items: RwLock::new(HashMap::new()),
            ttl: None,
            sweep_at: AtomicUsize::new(MIN_SWEEP_LEN),
        }
    }
}

impl InMemoryCache {
    /// Cache whose keys never expire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache whose keys expire `ttl` after they were last stored.
    pub fn with_ttl(ttl: Duration) -> Self {
        InMemoryCache {
            ttl: Some(ttl),
            ..Self::default()
        }
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.items
            .read()
            .await
            .values()
            .filter(|expiry| is_live(**expiry, now))
            .count()
    }

    /// Whether no live key is cached.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether `key` is cached and not expired.
    pub async fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.items
            .read()
            .await
            .get(key)
            .is_some_and(|expiry| is_live(*expiry, now))
    }
}

fn is_live(expiry: Option<Instant>, now: Instant) -> bool {
    expiry.map_or(true, |deadline| deadline > now)
}

#[async_trait]
impl DedupCache for InMemoryCache {
    async fn get(&self, keys: &[String]) -> Result<Vec<String>, CacheError> {
        let now = Instant::now();
        let items = self.items.read().await;
        Ok(keys
            .iter()
            .filter(|key| items.get(*key).is_some_and(|expiry| is_live(*expiry, now)))
            .cloned()
            .collect())
    }

    async fn store(&self, keys: &HashSet<String>) -> Result<(), CacheError> {
        let expiry = self.ttl.map(|ttl| Instant::now() + ttl);
        let mut items = self.items.write().await;
        if self.ttl.is_some() && items.len() >= self.sweep_at.load(Ordering::Relaxed) {
            let now = Instant::now();
            items.retain(|_, deadline| is_live(*deadline, now));
            self.sweep_at
                .store((items.len() * 2).max(MIN_SWEEP_LEN), Ordering::Relaxed);
        }
        for key in keys {
            items.insert(key.clone(), expiry);
        }
        Ok(())
    }
}

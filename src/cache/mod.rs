//! Deduplication caches.
//!
//! A cache remembers which record keys have already been accepted so that
//! repeats are dropped within a run and across runs. Backends must answer a
//! bulk lookup completely or fail the whole call.

mod memory;
mod redis;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error_handling::CacheError;

pub use self::redis::{RedisCache, RedisCacheConfig};
pub use memory::InMemoryCache;

/// Key-existence store consulted by the deduplication stage.
#[async_trait]
pub trait DedupCache: Send + Sync {
    /// Returns the subset of `keys` already known to the cache, in any order.
    async fn get(&self, keys: &[String]) -> Result<Vec<String>, CacheError>;

    /// Marks `keys` as known.
    async fn store(&self, keys: &HashSet<String>) -> Result<(), CacheError>;
}

//! Redis-backed deduplication cache.
//!
//! Lookups are a single `MGET`; commits are one pipeline of `SET ... EX` so a
//! whole batch costs one round trip each way.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::DedupCache;
use crate::config::{CACHE_TTL, DEFAULT_REDIS_URL, REDIS_CONNECT_TIMEOUT, REDIS_KEY_PREFIX};
use crate::error_handling::CacheError;

/// Connection settings for `RedisCache`.
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Server URL, e.g. `redis://127.0.0.1:6379/0`
    pub url: String,
    /// Retention of each key; `None` keeps keys forever
    pub ttl: Option<Duration>,
    /// Namespace prepended to every key
    pub key_prefix: String,
    /// Bound on connecting and the initial `PING`
    pub connect_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REDIS_URL.to_string(),
            ttl: Some(CACHE_TTL),
            key_prefix: REDIS_KEY_PREFIX.to_string(),
            connect_timeout: REDIS_CONNECT_TIMEOUT,
        }
    }
}

/// Cache shared across processes and runs through Redis.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    ttl_secs: u64,
    key_prefix: String,
}

impl RedisCache {
    /// Connects and pings the server so a bad address fails at startup.
    ///
    /// Gives up with `CacheError::Unavailable` once `connect_timeout` elapses.
    pub async fn connect(config: &RedisCacheConfig) -> Result<Self, CacheError> {
        let client = redis::Client::open(config.url.as_str())?;
        let conn = tokio::time::timeout(config.connect_timeout, async {
            let mut conn = ConnectionManager::new(client).await?;
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, CacheError>(conn)
        })
        .await
        .map_err(|_| {
            CacheError::Unavailable(format!(
                "no connection to {} within {:?}",
                config.url, config.connect_timeout
            ))
        })??;

        log::info!("Connected to Redis cache at {}", config.url);

        Ok(RedisCache {
            conn,
            ttl_secs: config.ttl.map_or(0, |ttl| ttl.as_secs().max(1)),
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        namespaced_key(&self.key_prefix, key)
    }
}

fn namespaced_key(prefix: &str, key: &str) -> String {
    format!("{prefix}{key}")
}

#[async_trait]
impl DedupCache for RedisCache {
    async fn get(&self, keys: &[String]) -> Result<Vec<String>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let namespaced: Vec<String> = keys.iter().map(|k| self.namespaced(k)).collect();
        let mut conn = self.conn.clone();
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&namespaced)
            .query_async(&mut conn)
            .await?;

        if values.len() != keys.len() {
            return Err(CacheError::Unavailable(format!(
                "MGET returned {} values for {} keys",
                values.len(),
                keys.len()
            )));
        }

        Ok(keys
            .iter()
            .zip(values)
            .filter_map(|(key, value)| value.map(|_| key.clone()))
            .collect())
    }

    async fn store(&self, keys: &HashSet<String>) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for key in keys {
            let key = self.namespaced(key);
            if self.ttl_secs > 0 {
                pipe.set_ex(key, 1, self.ttl_secs).ignore();
            } else {
                pipe.set(key, 1).ignore();
            }
        }

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}

//! Cache and store backend construction.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use crate::cache::{DedupCache, InMemoryCache, RedisCache, RedisCacheConfig};
use crate::config::{CacheBackend, LoadConfig, StoreBackend, REDIS_KEY_PREFIX};
use crate::storage::{
    init_db_pool_with_path, run_migrations, InMemoryStore, RecordStore, SqliteStore,
};

/// Builds the deduplication cache selected by `config`.
///
/// A Redis backend is pinged here, so an unreachable server fails the load
/// before any stage starts.
pub async fn init_cache(config: &LoadConfig) -> Result<Arc<dyn DedupCache>> {
    match config.cache {
        CacheBackend::Memory => {
            info!("Using in-memory deduplication cache");
            let cache = match config.cache_ttl() {
                Some(ttl) => InMemoryCache::with_ttl(ttl),
                None => InMemoryCache::new(),
            };
            Ok(Arc::new(cache))
        }
        CacheBackend::Redis => {
            let redis_config = RedisCacheConfig {
                url: config.redis_url.clone(),
                ttl: config.cache_ttl(),
                key_prefix: REDIS_KEY_PREFIX.to_string(),
                connect_timeout: config.redis_connect_timeout(),
            };
            let cache = RedisCache::connect(&redis_config)
                .await
                .with_context(|| format!("Failed to connect to Redis at {}", config.redis_url))?;
            Ok(Arc::new(cache))
        }
    }
}

/// Store handles for a load.
///
/// `sqlite` is set when the records go to a database, so the run history can
/// be written alongside them.
pub struct StoreHandles {
    /// Store the pipeline writes to
    pub store: Arc<dyn RecordStore>,
    /// Same store as `store` when it is SQLite
    pub sqlite: Option<SqliteStore>,
}

/// Builds the durable store selected by `config`.
pub async fn init_store(config: &LoadConfig) -> Result<StoreHandles> {
    match config.store {
        StoreBackend::Memory => {
            info!("Using in-memory store; records are discarded on exit");
            Ok(StoreHandles {
                store: Arc::new(InMemoryStore::new()),
                sqlite: None,
            })
        }
        StoreBackend::Sqlite => {
            let store = open_sqlite_store(&config.db_path).await?;
            Ok(StoreHandles {
                store: Arc::new(store.clone()),
                sqlite: Some(store),
            })
        }
    }
}

/// Opens (creating if needed) and migrates the SQLite database at `db_path`.
pub async fn open_sqlite_store(db_path: &std::path::Path) -> Result<SqliteStore> {
    let pool = init_db_pool_with_path(db_path)
        .await
        .context("Failed to initialize database pool")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(SqliteStore::new(pool))
}

//! Token cache layer
//!
//! This module provides the cache in front of token issuance. It supports:
//! - In-memory cache (moka) - default, for single-instance deployment
//! - Redis cache - optional, for distributed deployment
//!
//! The cache driver is selected based on configuration. Cached values are
//! opaque token strings: the cache layer never interprets them, and every
//! write carries its own TTL so the cache window tracks the token's
//! embedded expiry.

pub mod memory;
#[cfg(feature = "redis-cache")]
pub mod redis;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CacheConfig, CacheDriver};

pub use memory::MemoryTokenCache;
#[cfg(feature = "redis-cache")]
pub use redis::RedisTokenCache;

/// Token cache trait
///
/// A missing key is `Ok(None)`; an `Err` always means a transport-level
/// failure talking to the cache.
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Get a value from the cache
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value in the cache with a per-entry TTL
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}

/// Create a cache instance based on configuration
///
/// - `CacheDriver::Memory` - in-memory cache using moka (default)
/// - `CacheDriver::Redis` - Redis cache (requires the `redis-cache` feature)
pub async fn create_cache(config: &CacheConfig) -> Result<Arc<dyn TokenCache>> {
    match config.driver {
        CacheDriver::Memory => Ok(Arc::new(MemoryTokenCache::new())),
        CacheDriver::Redis => {
            #[cfg(feature = "redis-cache")]
            {
                let redis_url = config.redis_url.as_ref().ok_or_else(|| {
                    anyhow::anyhow!(
                        "Redis URL is required when using the Redis cache driver. \
                         Set 'cache.redis_url' or the KEYGATE_CACHE_REDIS_URL environment variable."
                    )
                })?;

                let cache = RedisTokenCache::new(redis_url).await?;
                Ok(Arc::new(cache))
            }

            #[cfg(not(feature = "redis-cache"))]
            {
                anyhow::bail!(
                    "Redis cache driver is configured but the 'redis-cache' feature is not enabled. \
                     Either enable the feature with `--features redis-cache` or use the 'memory' driver."
                )
            }
        }
    }
}

//! Redis token cache implementation
//!
//! Provides a distributed token cache using Redis for multi-instance
//! deployments. TTL-based expiration goes through SETEX, so the server
//! evicts each token at the end of the window it was written with.

use super::TokenCache;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// Redis token cache implementation
pub struct RedisTokenCache {
    /// Multiplexed connection for async operations
    connection: MultiplexedConnection,
}

impl std::fmt::Debug for RedisTokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTokenCache").finish_non_exhaustive()
    }
}

impl RedisTokenCache {
    /// Create a new Redis cache with the given connection URL
    ///
    /// # Errors
    /// Returns an error if the connection cannot be established.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).context("Failed to create Redis client")?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl TokenCache for RedisTokenCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();

        let value: Option<String> = conn
            .get(key)
            .await
            .context("Failed to get value from Redis")?;

        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();

        // SETEX rejects a zero expiry; clamp to the minimum resolution
        let ttl_secs = ttl.as_secs().max(1);

        let _: () = conn
            .set_ex(key, value, ttl_secs)
            .await
            .context("Failed to set value in Redis")?;

        Ok(())
    }
}

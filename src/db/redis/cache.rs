use redis::AsyncCommands;
use redis::Client;

use crate::db::cache::{CacheKey, KeyValueCache};
use crate::error::CacheError;

/// Creates a Redis client for caching
///
/// The connection itself is opened lazily on the first command.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Cache handler backed by Redis
///
/// Entries are written with a plain `SET`: they persist until cleared by hand.
#[derive(Clone)]
pub struct RedisCache {
    redis_client: Client,
}

impl RedisCache {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }
}

#[async_trait::async_trait]
impl KeyValueCache for RedisCache {
    async fn get_raw(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;
        Ok(cached)
    }

    async fn set_raw(&self, key: &CacheKey, value: String) -> Result<(), CacheError> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.set(key.to_string(), value).await?;
        tracing::debug!(key = %key, "Cached value without expiry");
        Ok(())
    }
}

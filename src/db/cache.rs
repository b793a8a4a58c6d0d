//! Local persistent key-value cache
//!
//! Values never expire and carry no version. The only key in use is `genres`.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::CacheError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Genres,
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Genres => write!(f, "genres"),
        }
    }
}

/// Raw string storage behind the cache
#[async_trait::async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get_raw(&self, key: &CacheKey) -> Result<Option<String>, CacheError>;

    async fn set_raw(&self, key: &CacheKey, value: String) -> Result<(), CacheError>;
}

impl dyn KeyValueCache {
    /// Retrieves a JSON value from the cache by key
    ///
    /// Returns `None` when the key is absent.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> Result<Option<T>, CacheError> {
        match self.get_raw(key).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Serializes the value as JSON and stores it under the key
    pub async fn set_in_cache<T: serde::Serialize + ?Sized>(
        &self,
        key: &CacheKey,
        value: &T,
    ) -> Result<(), CacheError> {
        let json = serde_json::to_string(value)?;
        self.set_raw(key, json).await
    }
}

/// In-process cache, used when no Redis URL is configured
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KeyValueCache for MemoryCache {
    async fn get_raw(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        Ok(self.entries.read().await.get(&key.to_string()).cloned())
    }

    async fn set_raw(&self, key: &CacheKey, value: String) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

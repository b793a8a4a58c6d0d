pub mod cache;
pub mod documents;
pub mod postgres;
pub mod redis;

pub use cache::{CacheKey, KeyValueCache, MemoryCache};
pub use documents::{DocumentStore, MemoryDocumentStore};
pub use postgres::{create_pool, PgDocumentStore};
pub use self::redis::{create_redis_client, RedisCache};

//! Redis storage backend.
//!
//! Each namespace is one Redis hash, so resetting a namespace is a single
//! `DEL`. Bucket claims use `HSETNX` for first-write-wins ownership across
//! processes sharing the server.
//!
//! # Example
//!
//! ```rust,no_run
//! use simgroup_core::storage::{KvStore, RedisStore};
//!
//! # async fn example() -> simgroup_core::Result<()> {
//! let store = RedisStore::connect("redis://localhost:6379").await?;
//! store.put("doc2sim", "doc-2", "doc-1").await?;
//! # Ok(())
//! # }
//! ```

use super::KvStore;
use crate::error::{Result, SimgroupError};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

/// Redis-backed key-value store.
///
/// Cloning is cheap; clones share the underlying multiplexed connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to a Redis server.
    ///
    /// # Arguments
    /// * `url` - Connection URL (e.g., "redis://localhost:6379")
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| SimgroupError::Config(format!("Invalid Redis URL {url}: {e}")))?;
        let conn = ConnectionManager::new(client).await?;
        debug!(url = %url, "Connected to Redis");
        Ok(Self { conn })
    }

    /// Wrap an existing connection manager.
    #[must_use]
    pub fn from_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

impl KvStore for RedisStore {
    async fn put(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(namespace, key, value).await?;
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.hget(namespace, key).await?;
        Ok(value)
    }

    async fn delete(&self, namespace: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(namespace).await?;
        Ok(())
    }

    async fn put_if_absent(&self, namespace: &str, key: &str, value: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let written: bool = conn.hset_nx(namespace, key, value).await?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_url() -> String {
        std::env::var("SIMGROUP_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into())
    }

    #[tokio::test]
    async fn test_invalid_url_is_config_error() {
        let result = RedisStore::connect("not-a-url").await;
        assert!(matches!(result, Err(SimgroupError::Config(_))));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_redis_store_roundtrip() {
        let store = RedisStore::connect(&redis_url()).await.unwrap();
        let ns = "simgroup-test-roundtrip";
        store.delete(ns).await.unwrap();

        store.put(ns, "k", "v").await.unwrap();
        assert_eq!(store.get(ns, "k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.get(ns, "missing").await.unwrap(), None);

        assert!(!store.put_if_absent(ns, "k", "other").await.unwrap());
        assert!(store.put_if_absent(ns, "k2", "w").await.unwrap());

        store.delete(ns).await.unwrap();
        assert_eq!(store.get(ns, "k").await.unwrap(), None);
    }
}

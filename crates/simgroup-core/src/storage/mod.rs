//! Key-value storage abstraction for clustering state.
//!
//! The clustering engine keeps two relations, each in its own namespace:
//! bucket key → first owner document, and document → group. Backends:
//! - In-memory (always available, used by tests and single-process runs)
//! - Redis (with `redis` feature), one hash per namespace

mod memory;

#[cfg(feature = "redis")]
mod redis;

pub use memory::MemoryStore;

#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

use crate::error::Result;
use std::sync::Arc;

/// Trait for key-value stores holding namespaced string relations.
///
/// All methods are async to support both local and remote stores. A store
/// error must surface as `Err`, never as a missing value.
#[allow(async_fn_in_trait)]
pub trait KvStore: Send + Sync {
    /// Set `key` to `value` in `namespace`, overwriting any previous value.
    async fn put(&self, namespace: &str, key: &str, value: &str) -> Result<()>;

    /// Get the value of `key` in `namespace`.
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>>;

    /// Drop a whole namespace.
    async fn delete(&self, namespace: &str) -> Result<()>;

    /// Set `key` only if it has no value yet. Returns whether the write happened.
    ///
    /// Backends with a native conditional write override this; the default
    /// is a non-atomic get followed by a put.
    async fn put_if_absent(&self, namespace: &str, key: &str, value: &str) -> Result<bool> {
        if self.get(namespace, key).await?.is_some() {
            return Ok(false);
        }
        self.put(namespace, key, value).await?;
        Ok(true)
    }
}

impl<T: KvStore> KvStore for Arc<T> {
    async fn put(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        (**self).put(namespace, key, value).await
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        (**self).get(namespace, key).await
    }

    async fn delete(&self, namespace: &str) -> Result<()> {
        (**self).delete(namespace).await
    }

    async fn put_if_absent(&self, namespace: &str, key: &str, value: &str) -> Result<bool> {
        (**self).put_if_absent(namespace, key, value).await
    }
}

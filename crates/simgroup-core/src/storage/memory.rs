//! In-memory storage backend.

use super::KvStore;
use crate::error::Result;
use std::collections::HashMap;
use tokio::sync::RwLock;

type Namespaces = HashMap<String, HashMap<String, String>>;

/// In-memory key-value store.
///
/// Namespaces are created lazily on first write. Conditional writes are
/// atomic under the write lock, so concurrent tasks racing on one bucket
/// key resolve first-write-wins.
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: RwLock<Namespaces>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys in a namespace (0 if it does not exist).
    pub async fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .map_or(0, HashMap::len)
    }
}

impl KvStore for MemoryStore {
    async fn put(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let guard = self.namespaces.read().await;
        Ok(guard.get(namespace).and_then(|ns| ns.get(key)).cloned())
    }

    async fn delete(&self, namespace: &str) -> Result<()> {
        self.namespaces.write().await.remove(namespace);
        Ok(())
    }

    async fn put_if_absent(&self, namespace: &str, key: &str, value: &str) -> Result<bool> {
        let mut guard = self.namespaces.write().await;
        let ns = guard.entry(namespace.to_string()).or_default();
        if ns.contains_key(key) {
            return Ok(false);
        }
        ns.insert(key.to_string(), value.to_string());
        Ok(true)
    }
}

//! Store wrappers shared by unit tests.

use simgroup_core::{KvStore, MemoryStore, Result};

/// In-memory store that yields to the scheduler before every operation, so
/// concurrent lookups interleave the way they do against a remote store.
#[derive(Default)]
pub(crate) struct YieldingStore {
    inner: MemoryStore,
}

impl YieldingStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

impl KvStore for YieldingStore {
    async fn put(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        tokio::task::yield_now().await;
        self.inner.put(namespace, key, value).await
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        tokio::task::yield_now().await;
        self.inner.get(namespace, key).await
    }

    async fn delete(&self, namespace: &str) -> Result<()> {
        tokio::task::yield_now().await;
        self.inner.delete(namespace).await
    }

    async fn put_if_absent(&self, namespace: &str, key: &str, value: &str) -> Result<bool> {
        tokio::task::yield_now().await;
        self.inner.put_if_absent(namespace, key, value).await
    }
}

//! Namespaced byte-value key/value store.
//!
//! This sits alongside [`crate::Database`] as the lower of NanoClaw's two
//! storage tiers: a flat, namespaced byte store used for append-only logs
//! (`GovActivity`, `LimitDenial`, memory access logs), snapshot blobs, and
//! anything else that does not need `SurrealQL`'s relational features.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{StorageError, StorageResult};

/// A namespaced byte-value store.
///
/// Implementations must make `set` atomically visible to subsequent
/// `get`/`list_keys` calls issued after it returns.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value by namespace and key.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Write a value, overwriting any prior value at the same key.
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Delete a value, if present. Not an error if absent.
    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<()>;

    /// List all keys in a namespace, in unspecified order.
    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>>;
}

/// In-memory [`KvStore`] implementation, for tests and for any deployment
/// that does not need durability across restarts.
#[derive(Default)]
pub struct MemoryKvStore {
    data: RwLock<BTreeMap<(String, String), Vec<u8>>>,
}

impl MemoryKvStore {
    /// Build an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let data = self.data.read().await;
        Ok(data.get(&(namespace.to_string(), key.to_string())).cloned())
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        let mut data = self.data.write().await;
        data.insert((namespace.to_string(), key.to_string()), value);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<()> {
        let mut data = self.data.write().await;
        data.remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        let data = self.data.read().await;
        Ok(data
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, key)| key.clone())
            .collect())
    }
}

/// `SurrealKV`-backed [`KvStore`], storing each value as a record in a
/// fixed `kv` table keyed by `namespace:key`.
pub struct SurrealKvStore {
    db: crate::Database,
}

impl SurrealKvStore {
    /// Wrap a connected [`crate::Database`].
    #[must_use]
    pub fn new(db: crate::Database) -> Self {
        Self { db }
    }

    fn record_id(namespace: &str, key: &str) -> String {
        format!("{namespace}:{key}")
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct KvRecord {
    namespace: String,
    key: String,
    value: Vec<u8>,
}

#[async_trait]
impl KvStore for SurrealKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let id = Self::record_id(namespace, key);
        let record: Option<KvRecord> = self
            .db
            .client()
            .select(("kv", id))
            .await
            .map_err(StorageError::from)?;
        Ok(record.map(|r| r.value))
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        let id = Self::record_id(namespace, key);
        let record = KvRecord {
            namespace: namespace.to_string(),
            key: key.to_string(),
            value,
        };
        let _: Option<KvRecord> = self
            .db
            .client()
            .upsert(("kv", id))
            .content(record)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<()> {
        let id = Self::record_id(namespace, key);
        let _: Option<KvRecord> = self
            .db
            .client()
            .delete(("kv", id))
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        let mut response = self
            .db
            .client()
            .query("SELECT key FROM kv WHERE namespace = $ns")
            .bind(("ns", namespace.to_string()))
            .await
            .map_err(StorageError::from)?;
        let keys: Vec<String> = response.take("key").map_err(StorageError::from)?;
        Ok(keys)
    }
}

/// A [`KvStore`] that transparently prefixes every namespace with a fixed
/// string, so a single backing store can be shared by multiple logical
/// owners (e.g. one group's IPC snapshots vs. another's) without key
/// collisions.
pub struct ScopedKvStore {
    inner: Arc<dyn KvStore>,
    prefix: String,
}

impl ScopedKvStore {
    /// Wrap `inner`, prefixing every namespace with `prefix`.
    #[must_use]
    pub fn new(inner: Arc<dyn KvStore>, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    fn scoped_namespace(&self, namespace: &str) -> String {
        format!("{}:{namespace}", self.prefix)
    }
}

#[async_trait]
impl KvStore for ScopedKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(&self.scoped_namespace(namespace), key).await
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.inner
            .set(&self.scoped_namespace(namespace), key, value)
            .await
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<()> {
        self.inner.delete(&self.scoped_namespace(namespace), key).await
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        self.inner.list_keys(&self.scoped_namespace(namespace)).await
    }
}

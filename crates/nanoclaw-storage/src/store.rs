//! Generic persistence primitives required by spec.md §4.A: single-row
//! upsert, read-by-key, conditional update-by-version (CAS), unique-
//! constraint insert-as-claim, and append-log. Domain repositories
//! (`tasks`, `governance`, `workers`, `limits`, `memory`, `router`) are
//! built on top of these.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::db::Database;
use crate::error::{StorageError, StorageResult};
use crate::kv::KvStore;

/// Handle bundling the relational [`Database`] and the namespaced
/// [`KvStore`] append-log backend.
#[derive(Clone)]
pub struct Store {
    db: Database,
    kv: std::sync::Arc<dyn KvStore>,
}

impl Store {
    /// Build a store over a connected database and a kv backend for
    /// append logs.
    #[must_use]
    pub fn new(db: Database, kv: std::sync::Arc<dyn KvStore>) -> Self {
        Self { db, kv }
    }

    /// Borrow the underlying relational database.
    #[must_use]
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Borrow the underlying kv backend.
    #[must_use]
    pub fn kv(&self) -> &(dyn KvStore + 'static) {
        self.kv.as_ref()
    }

    /// Insert or overwrite a row unconditionally.
    ///
    /// # Errors
    /// Returns [`StorageError::Internal`] if the underlying query fails.
    pub async fn upsert<T>(&self, table: &str, id: &str, value: &T) -> StorageResult<()>
    where
        T: Serialize + Send + Sync,
    {
        let _: Option<Value> = self
            .db
            .client()
            .upsert((table, id))
            .content(serde_json::to_value(value)?)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    /// Read a row by its key.
    ///
    /// # Errors
    /// Returns [`StorageError::Internal`] if the underlying query fails,
    /// or [`StorageError::Serialization`] if the stored row does not
    /// match `T`.
    pub async fn get<T>(&self, table: &str, id: &str) -> StorageResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let row: Option<T> = self
            .db
            .client()
            .select((table, id))
            .await
            .map_err(StorageError::from)?;
        Ok(row)
    }

    /// Delete a row unconditionally. Not an error if absent.
    ///
    /// # Errors
    /// Returns [`StorageError::Internal`] if the underlying query fails.
    pub async fn delete(&self, table: &str, id: &str) -> StorageResult<()> {
        let _: Option<Value> = self
            .db
            .client()
            .delete((table, id))
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    /// Attempt a unique-constraint insert, used as the idempotent claim
    /// primitive for dispatch and nonce replay-protection. Fails with
    /// [`StorageError::AlreadyClaimed`] if a row already exists at `id`.
    ///
    /// # Errors
    /// Returns [`StorageError::AlreadyClaimed`] if the row already
    /// exists, or [`StorageError::Internal`] on other query failures.
    pub async fn claim_unique<T>(&self, table: &str, id: &str, value: &T) -> StorageResult<()>
    where
        T: Serialize + Send + Sync,
    {
        if self.get::<Value>(table, id).await?.is_some() {
            return Err(StorageError::AlreadyClaimed(format!("{table}:{id}")));
        }
        let result: Result<Option<Value>, surrealdb::Error> = self
            .db
            .client()
            .create((table, id))
            .content(serde_json::to_value(value)?)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::AlreadyClaimed(format!("{table}:{id}")))
            }
            Err(err) => Err(StorageError::from(err)),
        }
    }

    /// Conditionally update a versioned row: loads the current row,
    /// verifies `expected_version` matches its `version` field, applies
    /// `mutate`, and writes the result back with `version + 1`.
    ///
    /// This is not a true single-statement CAS (the embedded `SurrealKV`
    /// engine serializes writes through one connection, so the
    /// check-then-write here cannot race with another write on the same
    /// connection) but preserves the optimistic-concurrency contract the
    /// data model requires.
    ///
    /// # Errors
    /// Returns [`StorageError::NotFound`] if no row exists at `id`, or
    /// [`StorageError::VersionConflict`] if `expected_version` is stale.
    pub async fn cas_update<T, F>(
        &self,
        table: &str,
        id: &str,
        expected_version: u64,
        mutate: F,
    ) -> StorageResult<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync + Versioned,
        F: FnOnce(T) -> T + Send,
    {
        let current: T = self
            .get(table, id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("{table}:{id}")))?;
        let actual = current.version();
        if actual != expected_version {
            return Err(StorageError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                actual,
            });
        }
        let mut updated = mutate(current);
        updated.set_version(actual + 1);
        self.upsert(table, id, &updated).await?;
        Ok(updated)
    }

    /// Append an entry to a namespaced log via the kv backend. Entries
    /// are stored under `{namespace}/{entry_id}` and the namespace's
    /// index (a JSON array of entry ids) is updated in the same call.
    ///
    /// # Errors
    /// Returns [`StorageError::Serialization`] if `entry` cannot be
    /// encoded, or any error the kv backend itself raises.
    pub async fn append<T>(&self, namespace: &str, entry_id: &str, entry: &T) -> StorageResult<()>
    where
        T: Serialize + Sync,
    {
        let bytes = serde_json::to_vec(entry)?;
        self.kv.set(namespace, entry_id, bytes).await?;

        let index_key = "__index__";
        let mut index: Vec<String> = match self.kv.get(namespace, index_key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => Vec::new(),
        };
        index.push(entry_id.to_string());
        self.kv
            .set(namespace, index_key, serde_json::to_vec(&index)?)
            .await?;
        Ok(())
    }

    /// Read every entry appended to a namespaced log, in append order.
    ///
    /// # Errors
    /// Returns [`StorageError::Serialization`] if a stored entry does not
    /// decode as `T`.
    pub async fn list_appended<T>(&self, namespace: &str) -> StorageResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let index: Vec<String> = match self.kv.get(namespace, "__index__").await? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => return Ok(Vec::new()),
        };
        let mut entries = Vec::with_capacity(index.len());
        for entry_id in index {
            if let Some(bytes) = self.kv.get(namespace, &entry_id).await? {
                entries.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(entries)
    }
}

fn is_unique_violation(err: &surrealdb::Error) -> bool {
    let message = err.to_string();
    message.contains("already exists") || message.contains("index")
}

/// Implemented by every data-model type that carries a monotonic
/// `version` field, so [`Store::cas_update`] can enforce optimistic
/// concurrency generically.
pub trait Versioned {
    /// Read the current version.
    fn version(&self) -> u64;
    /// Overwrite the version (called by [`Store::cas_update`] after a
    /// successful write).
    fn set_version(&mut self, version: u64);
}

impl Versioned for nanoclaw_core::GovTask {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

impl Versioned for nanoclaw_core::Memory {
    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

//! Memory Broker repository.

use nanoclaw_core::{Memory, MemoryAccessLogEntry, MemoryId};

use crate::error::{StorageError, StorageResult};
use crate::store::Store;

const TABLE: &str = "memory";
const ACCESS_LOG_NAMESPACE: &str = "memory_access";

/// Typed access to stored memories and their access log.
pub struct MemoryRepository<'a> {
    store: &'a Store,
}

impl<'a> MemoryRepository<'a> {
    /// Build a repository over `store`.
    #[must_use]
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Insert or overwrite a memory, bumping `version` via CAS when one
    /// already exists, or inserting fresh at `version = 0` otherwise.
    pub async fn upsert(&self, memory: &Memory) -> StorageResult<()> {
        self.store.upsert(TABLE, &memory.id.0, memory).await
    }

    /// Apply a compare-and-swap update to an existing memory.
    pub async fn cas_update<F>(
        &self,
        id: &MemoryId,
        expected_version: u64,
        mutate: F,
    ) -> StorageResult<Memory>
    where
        F: FnOnce(Memory) -> Memory + Send,
    {
        self.store.cas_update(TABLE, &id.0, expected_version, mutate).await
    }

    /// Load a memory by id.
    pub async fn get(&self, id: &MemoryId) -> StorageResult<Option<Memory>> {
        self.store.get(TABLE, &id.0).await
    }

    /// Full-text-ish search over content and tags, scoped by the caller;
    /// `mem_recall`'s level/scope/product filtering is applied by
    /// `nanoclaw-memory`, not here — this returns the unfiltered
    /// candidate set.
    pub async fn search(&self, query: &str, limit: usize) -> StorageResult<Vec<Memory>> {
        let mut response = self
            .store
            .db()
            .client()
            .query(
                "SELECT * FROM memory WHERE content ~ $q OR $q IN tags ORDER BY updated_at DESC LIMIT $limit",
            )
            .bind(("q", query.to_string()))
            .bind(("limit", limit as i64))
            .await
            .map_err(StorageError::from)?;
        let memories: Vec<Memory> = response.take(0).map_err(StorageError::from)?;
        Ok(memories)
    }

    /// Append an access-log entry for a single memory considered during a
    /// recall (whether returned or denied).
    pub async fn log_access(&self, entry: &MemoryAccessLogEntry) -> StorageResult<()> {
        let entry_id = format!("{}:{}", entry.memory_id, entry.created_at.timestamp_nanos_opt().unwrap_or(0));
        self.store.append(ACCESS_LOG_NAMESPACE, &entry_id, entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::kv::MemoryKvStore;
    use chrono::Utc;
    use nanoclaw_core::{GroupFolder, MemoryLevel};
    use std::sync::Arc;

    async fn store() -> Store {
        let db = Database::connect_memory().await.unwrap();
        Store::new(db, Arc::new(MemoryKvStore::new()))
    }

    fn sample(id: &str) -> Memory {
        Memory {
            id: MemoryId::new(id),
            content: "likes dark roast coffee".to_string(),
            content_hash: "abc123".to_string(),
            level: MemoryLevel::L2,
            scope: "COMPANY".to_string(),
            product_id: None,
            group_folder: GroupFolder::new("main"),
            tags: vec!["preferences".to_string()],
            pii_detected: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let store = store().await;
        let repo = MemoryRepository::new(&store);
        let memory = sample("m1");
        repo.upsert(&memory).await.unwrap();

        let fetched = repo.get(&memory.id).await.unwrap().unwrap();
        assert_eq!(fetched.content, memory.content);
    }

    #[tokio::test]
    async fn test_cas_update_bumps_version() {
        let store = store().await;
        let repo = MemoryRepository::new(&store);
        let memory = sample("m1");
        repo.upsert(&memory).await.unwrap();

        let updated = repo
            .cas_update(&memory.id, 0, |mut m| {
                m.content = "updated".to_string();
                m
            })
            .await
            .unwrap();
        assert_eq!(updated.version, 1);
        assert_eq!(updated.content, "updated");
    }
}

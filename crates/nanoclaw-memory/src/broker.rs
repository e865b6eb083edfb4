//! Memory Broker: `mem_store` and `mem_recall` (spec.md §4.I).

use chrono::{DateTime, Utc};
use nanoclaw_core::{GroupFolder, Memory, MemoryAccessLogEntry, MemoryId, MemoryLevel, ProductId};
use nanoclaw_storage::MemoryRepository;
use uuid::Uuid;

use crate::classify::{classify, content_hash};
use crate::error::{MemoryError, MemoryResult};
use crate::scan::scan;

/// Candidate multiplier applied to the caller's requested `limit` before
/// authorization filtering, so a recall doesn't starve just because the
/// first few matches happen to be access-denied.
const CANDIDATE_MULTIPLIER: usize = 4;

/// Handles `mem_store`/`mem_recall` IPC requests against a
/// [`MemoryRepository`].
pub struct MemoryBroker<'a> {
    repo: MemoryRepository<'a>,
    main_group: GroupFolder,
}

impl<'a> MemoryBroker<'a> {
    /// Build a broker over `repo`. `main_group` is the privileged group
    /// allowed to store and recall `L3` memories.
    #[must_use]
    pub fn new(repo: MemoryRepository<'a>, main_group: GroupFolder) -> Self {
        Self { repo, main_group }
    }

    /// Store a new memory.
    ///
    /// Rejects with [`MemoryError::AccessDenied`] if `level` is explicitly
    /// `L3` and `caller_group` is not the main group. Scans content for
    /// PII/injection indicators (recorded, never blocking), classifies a
    /// level if none was supplied, hashes the content, and upserts at
    /// `version = 0`.
    ///
    /// # Errors
    /// Returns [`MemoryError::AccessDenied`] or a wrapped storage error.
    #[allow(clippy::too_many_arguments)]
    pub async fn store(
        &self,
        caller_group: &GroupFolder,
        content: String,
        level: Option<MemoryLevel>,
        scope: String,
        product_id: Option<ProductId>,
        group_folder: GroupFolder,
        tags: Vec<String>,
        now: DateTime<Utc>,
    ) -> MemoryResult<Memory> {
        if level == Some(MemoryLevel::L3) && *caller_group != self.main_group {
            return Err(MemoryError::AccessDenied {
                reason: format!("{caller_group} may not store L3 memories"),
            });
        }

        let content_scan = scan(&content);
        let level = level.unwrap_or_else(|| classify(&content_scan));
        let hash = content_hash(&content);

        let memory = Memory {
            id: MemoryId::new(Uuid::new_v4().to_string()),
            content,
            content_hash: hash,
            level,
            scope,
            product_id,
            group_folder,
            tags,
            pii_detected: content_scan.pii_detected,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        self.repo.upsert(&memory).await?;
        Ok(memory)
    }

    /// Recall up to `limit` memories matching `query`, visible to
    /// `caller_group` under the level/scope rules in spec.md §4.I. Logs
    /// one access-log entry per candidate considered, whether returned or
    /// denied.
    ///
    /// # Errors
    /// Returns a wrapped storage error.
    pub async fn recall(
        &self,
        caller_group: &GroupFolder,
        query: &str,
        product_id: Option<&ProductId>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> MemoryResult<Vec<Memory>> {
        let candidates = self
            .repo
            .search(query, limit.saturating_mul(CANDIDATE_MULTIPLIER).max(limit))
            .await?;

        let mut returned = Vec::with_capacity(limit);
        for candidate in candidates {
            let Some(denial_reason) =
                self.denial_reason(&candidate, caller_group, product_id)
            else {
                if returned.len() < limit {
                    self.log(&candidate, caller_group, true, None, now).await?;
                    returned.push(candidate);
                    continue;
                }
                self.log(
                    &candidate,
                    caller_group,
                    false,
                    Some("recall limit reached".to_string()),
                    now,
                )
                .await?;
                continue;
            };
            self.log(&candidate, caller_group, false, Some(denial_reason), now)
                .await?;
        }
        Ok(returned)
    }

    /// `None` if `caller_group` may see `memory` under the current
    /// recall's `product_id` scope; `Some(reason)` otherwise.
    fn denial_reason(
        &self,
        memory: &Memory,
        caller_group: &GroupFolder,
        product_id: Option<&ProductId>,
    ) -> Option<String> {
        if memory.level == MemoryLevel::L3 && *caller_group != self.main_group {
            return Some("L3 memory restricted to the main group".to_string());
        }
        if let Some(memory_product) = &memory.product_id {
            match product_id {
                Some(requested) if requested == memory_product => {}
                _ => return Some("product-scoped memory outside requested product".to_string()),
            }
        }
        None
    }

    async fn log(
        &self,
        memory: &Memory,
        caller_group: &GroupFolder,
        returned: bool,
        denial_reason: Option<String>,
        now: DateTime<Utc>,
    ) -> MemoryResult<()> {
        self.repo
            .log_access(&MemoryAccessLogEntry {
                memory_id: memory.id.clone(),
                requested_by: caller_group.clone(),
                returned,
                denial_reason,
                created_at: now,
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanoclaw_storage::{Database, MemoryKvStore, Store};
    use std::sync::Arc;

    async fn store() -> Store {
        let db = Database::connect_memory().await.unwrap();
        Store::new(db, Arc::new(MemoryKvStore::new()))
    }

    fn main_group() -> GroupFolder {
        GroupFolder::new("main")
    }

    #[tokio::test]
    async fn test_store_rejects_l3_from_non_main_group() {
        let store = store().await;
        let repo = MemoryRepository::new(&store);
        let broker = MemoryBroker::new(repo, main_group());

        let err = broker
            .store(
                &GroupFolder::new("other"),
                "secret stuff".to_string(),
                Some(MemoryLevel::L3),
                "COMPANY".to_string(),
                None,
                GroupFolder::new("other"),
                vec![],
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::AccessDenied { .. }));
    }

    #[tokio::test]
    async fn test_store_classifies_pii_content_as_l3() {
        let store = store().await;
        let repo = MemoryRepository::new(&store);
        let broker = MemoryBroker::new(repo, main_group());

        let memory = broker
            .store(
                &main_group(),
                "email me at alice@example.com".to_string(),
                None,
                "COMPANY".to_string(),
                None,
                main_group(),
                vec![],
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(memory.level, MemoryLevel::L3);
        assert!(memory.pii_detected);
    }

    #[tokio::test]
    async fn test_recall_excludes_l3_for_non_main_group() {
        let store = store().await;
        let repo = MemoryRepository::new(&store);
        let broker = MemoryBroker::new(repo, main_group());

        broker
            .store(
                &main_group(),
                "classified launch plan".to_string(),
                Some(MemoryLevel::L3),
                "COMPANY".to_string(),
                None,
                main_group(),
                vec!["launch".to_string()],
                Utc::now(),
            )
            .await
            .unwrap();

        let results = broker
            .recall(
                &GroupFolder::new("other"),
                "launch",
                None,
                10,
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(results.is_empty());

        let main_results = broker
            .recall(&main_group(), "launch", None, 10, Utc::now())
            .await
            .unwrap();
        assert_eq!(main_results.len(), 1);
    }

    #[tokio::test]
    async fn test_recall_excludes_mismatched_product() {
        let store = store().await;
        let repo = MemoryRepository::new(&store);
        let broker = MemoryBroker::new(repo, main_group());

        broker
            .store(
                &main_group(),
                "product alpha roadmap".to_string(),
                Some(MemoryLevel::L2),
                "PRODUCT".to_string(),
                Some(ProductId::new("alpha")),
                main_group(),
                vec!["roadmap".to_string()],
                Utc::now(),
            )
            .await
            .unwrap();

        let wrong_product = broker
            .recall(
                &main_group(),
                "roadmap",
                Some(&ProductId::new("beta")),
                10,
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(wrong_product.is_empty());

        let right_product = broker
            .recall(
                &main_group(),
                "roadmap",
                Some(&ProductId::new("alpha")),
                10,
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(right_product.len(), 1);
    }
}

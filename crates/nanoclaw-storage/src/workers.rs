//! Worker Fleet Dispatcher repository.

use nanoclaw_core::{Worker, WorkerId, WorkerStatus};

use crate::error::{StorageError, StorageResult};
use crate::store::Store;

const TABLE: &str = "worker";

/// Typed access to the `worker` table.
pub struct WorkerRepository<'a> {
    store: &'a Store,
}

impl<'a> WorkerRepository<'a> {
    /// Build a repository over `store`.
    #[must_use]
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Insert or overwrite a worker's inventory entry.
    pub async fn upsert(&self, worker: &Worker) -> StorageResult<()> {
        self.store.upsert(TABLE, &worker.id.0, worker).await
    }

    /// Load a worker by id.
    pub async fn get(&self, id: &WorkerId) -> StorageResult<Option<Worker>> {
        self.store.get(TABLE, &id.0).await
    }

    /// List the full fleet inventory.
    pub async fn list(&self) -> StorageResult<Vec<Worker>> {
        let workers: Vec<Worker> = self
            .store
            .db()
            .client()
            .select(TABLE)
            .await
            .map_err(StorageError::from)?;
        Ok(workers)
    }

    /// Atomically claim one unit of dispatch capacity on a worker still
    /// eligible for `group`. Returns `None` if the worker is missing or
    /// no longer eligible by the time this claim runs (capacity
    /// exhausted, offline, or no longer serving the group) — callers
    /// must fall back to the next candidate rather than retry.
    pub async fn claim_capacity(
        &self,
        id: &WorkerId,
        group: &str,
    ) -> StorageResult<Option<Worker>> {
        let Some(mut worker) = self.get(id).await? else {
            return Ok(None);
        };
        if !worker.is_eligible(group) {
            return Ok(None);
        }
        worker.current_wip += 1;
        self.upsert(&worker).await?;
        Ok(Some(worker))
    }

    /// Release one unit of dispatch capacity, floored at zero so a
    /// duplicate completion callback cannot drive `current_wip`
    /// negative.
    pub async fn release_capacity(&self, id: &WorkerId) -> StorageResult<Option<Worker>> {
        let Some(mut worker) = self.get(id).await? else {
            return Ok(None);
        };
        worker.current_wip = worker.current_wip.saturating_sub(1);
        self.upsert(&worker).await?;
        Ok(Some(worker))
    }

    /// Record one health-check outcome, applying the 3-strikes-offline
    /// policy: a success resets the failure streak and marks the worker
    /// `Online`; a failure increments the streak and flips the worker to
    /// `Offline` once `failure_threshold` consecutive failures have
    /// accumulated. Returns the updated worker and whether this call
    /// changed `status`.
    pub async fn record_health(
        &self,
        id: &WorkerId,
        healthy: bool,
        failure_threshold: u32,
    ) -> StorageResult<Option<(Worker, bool)>> {
        let Some(mut worker) = self.get(id).await? else {
            return Ok(None);
        };
        let previous_status = worker.status;
        if healthy {
            worker.consecutive_failures = 0;
            worker.status = WorkerStatus::Online;
        } else {
            worker.consecutive_failures += 1;
            if worker.consecutive_failures >= failure_threshold {
                worker.status = WorkerStatus::Offline;
            }
        }
        self.upsert(&worker).await?;
        let transitioned = worker.status != previous_status;
        Ok(Some((worker, transitioned)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::kv::MemoryKvStore;
    use nanoclaw_core::WorkerStatus;
    use std::sync::Arc;

    async fn store() -> Store {
        let db = Database::connect_memory().await.unwrap();
        Store::new(db, Arc::new(MemoryKvStore::new()))
    }

    fn sample(id: &str) -> Worker {
        Worker {
            id: WorkerId::new(id),
            host: "10.0.0.1".to_string(),
            user: "nanoclaw".to_string(),
            ssh_port: 22,
            local_port: 9100,
            remote_port: 8080,
            status: WorkerStatus::Online,
            max_wip: 2,
            current_wip: 0,
            shared_secret: "secret".to_string(),
            groups_served: vec!["developer".to_string()],
            consecutive_failures: 0,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_list() {
        let store = store().await;
        let repo = WorkerRepository::new(&store);
        repo.upsert(&sample("w1")).await.unwrap();
        repo.upsert(&sample("w2")).await.unwrap();

        let workers = repo.list().await.unwrap();
        assert_eq!(workers.len(), 2);
    }

    #[tokio::test]
    async fn test_claim_capacity_increments_wip() {
        let store = store().await;
        let repo = WorkerRepository::new(&store);
        repo.upsert(&sample("w1")).await.unwrap();

        let claimed = repo
            .claim_capacity(&WorkerId::new("w1"), "developer")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.current_wip, 1);
    }

    #[tokio::test]
    async fn test_claim_capacity_rejects_ineligible_worker() {
        let store = store().await;
        let repo = WorkerRepository::new(&store);
        let mut worker = sample("w1");
        worker.groups_served = vec!["designer".to_string()];
        repo.upsert(&worker).await.unwrap();

        let claimed = repo
            .claim_capacity(&WorkerId::new("w1"), "developer")
            .await
            .unwrap();
        assert!(claimed.is_none());
    }

    #[tokio::test]
    async fn test_release_capacity_floors_at_zero() {
        let store = store().await;
        let repo = WorkerRepository::new(&store);
        repo.upsert(&sample("w1")).await.unwrap();

        let released = repo
            .release_capacity(&WorkerId::new("w1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(released.current_wip, 0);
    }

    #[tokio::test]
    async fn test_record_health_marks_offline_after_threshold() {
        let store = store().await;
        let repo = WorkerRepository::new(&store);
        repo.upsert(&sample("w1")).await.unwrap();
        let id = WorkerId::new("w1");

        let (_, transitioned) = repo.record_health(&id, false, 3).await.unwrap().unwrap();
        assert!(!transitioned);
        repo.record_health(&id, false, 3).await.unwrap().unwrap();
        let (worker, transitioned) = repo.record_health(&id, false, 3).await.unwrap().unwrap();
        assert!(transitioned);
        assert_eq!(worker.status, WorkerStatus::Offline);
        assert_eq!(worker.consecutive_failures, 3);
    }

    #[tokio::test]
    async fn test_record_health_success_resets_streak() {
        let store = store().await;
        let repo = WorkerRepository::new(&store);
        let mut worker = sample("w1");
        worker.status = WorkerStatus::Offline;
        worker.consecutive_failures = 3;
        repo.upsert(&worker).await.unwrap();

        let (worker, transitioned) = repo
            .record_health(&WorkerId::new("w1"), true, 3)
            .await
            .unwrap()
            .unwrap();
        assert!(transitioned);
        assert_eq!(worker.status, WorkerStatus::Online);
        assert_eq!(worker.consecutive_failures, 0);
    }
}

//! Governance Loop repository: `GovTask`, `GovActivity`, `GovApproval`,
//! `GovDispatch`.

use nanoclaw_core::{
    DispatchKey, GovActivity, GovApproval, GovDispatch, GovState, GovTask, GovTaskId, ProductId,
};

use crate::error::{StorageError, StorageResult};
use crate::store::Store;

const GOV_TASK_TABLE: &str = "gov_task";
const GOV_DISPATCH_TABLE: &str = "gov_dispatch";
const ACTIVITY_NAMESPACE_PREFIX: &str = "gov_activity";
const APPROVAL_TABLE: &str = "gov_approval";

/// Typed access to governed-task state.
pub struct GovernanceRepository<'a> {
    store: &'a Store,
}

impl<'a> GovernanceRepository<'a> {
    /// Build a repository over `store`.
    #[must_use]
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Insert or overwrite a `GovTask`. Used only for initial creation;
    /// subsequent state changes must go through [`Self::cas_update`].
    pub async fn upsert(&self, task: &GovTask) -> StorageResult<()> {
        self.store.upsert(GOV_TASK_TABLE, &task.id.0, task).await
    }

    /// Load a `GovTask` by id.
    pub async fn get(&self, id: &GovTaskId) -> StorageResult<Option<GovTask>> {
        self.store.get(GOV_TASK_TABLE, &id.0).await
    }

    /// Apply a compare-and-swap update, failing with
    /// [`StorageError::VersionConflict`] if `expected_version` is stale.
    pub async fn cas_update<F>(
        &self,
        id: &GovTaskId,
        expected_version: u64,
        mutate: F,
    ) -> StorageResult<GovTask>
    where
        F: FnOnce(GovTask) -> GovTask + Send,
    {
        self.store
            .cas_update(GOV_TASK_TABLE, &id.0, expected_version, mutate)
            .await
    }

    /// Append an audit activity entry for a task.
    pub async fn append_activity(&self, activity: &GovActivity) -> StorageResult<()> {
        let namespace = format!("{ACTIVITY_NAMESPACE_PREFIX}:{}", activity.task_id);
        let entry_id = format!("{}", activity.created_at.timestamp_nanos_opt().unwrap_or(0));
        self.store.append(&namespace, &entry_id, activity).await
    }

    /// Read every recorded activity for a task, in append order.
    pub async fn activities_for(&self, task_id: &GovTaskId) -> StorageResult<Vec<GovActivity>> {
        let namespace = format!("{ACTIVITY_NAMESPACE_PREFIX}:{task_id}");
        self.store.list_appended(&namespace).await
    }

    /// Record an approval against a gate. Unique on `(task_id, gate_type)`
    /// — a second approval attempt for the same gate fails with
    /// [`StorageError::AlreadyClaimed`].
    pub async fn record_approval(&self, approval: &GovApproval) -> StorageResult<()> {
        let key = format!("{}:{}", approval.task_id, approval.gate_type);
        self.store
            .claim_unique(APPROVAL_TABLE, &key, approval)
            .await
    }

    /// Look up a recorded approval for a given gate, if any.
    pub async fn get_approval(
        &self,
        task_id: &GovTaskId,
        gate_type: &str,
    ) -> StorageResult<Option<GovApproval>> {
        let key = format!("{task_id}:{gate_type}");
        self.store.get(APPROVAL_TABLE, &key).await
    }

    /// All approvals recorded for a task.
    pub async fn approvals_for(&self, task_id: &GovTaskId) -> StorageResult<Vec<GovApproval>> {
        let mut response = self
            .store
            .db()
            .client()
            .query("SELECT * FROM gov_approval WHERE task_id = $task_id")
            .bind(("task_id", task_id.0.clone()))
            .await
            .map_err(StorageError::from)?;
        let approvals: Vec<GovApproval> = response.take(0).map_err(StorageError::from)?;
        Ok(approvals)
    }

    /// Attempt to claim a dispatch. Success means this call is the unique
    /// authority to issue the underlying worker HTTP dispatch for this
    /// transition/version; failure with
    /// [`StorageError::AlreadyClaimed`] means another tick already
    /// claimed it.
    pub async fn claim_dispatch(&self, dispatch: &GovDispatch) -> StorageResult<()> {
        self.store
            .claim_unique(GOV_DISPATCH_TABLE, &dispatch.dispatch_key.0, dispatch)
            .await
    }

    /// Overwrite a dispatch row's status/timestamps after the claim has
    /// already succeeded (e.g. moving `Enqueued -> Sent`).
    pub async fn update_dispatch(&self, dispatch: &GovDispatch) -> StorageResult<()> {
        self.store
            .upsert(GOV_DISPATCH_TABLE, &dispatch.dispatch_key.0, dispatch)
            .await
    }

    /// Look up a dispatch record by its key.
    pub async fn get_dispatch(&self, key: &DispatchKey) -> StorageResult<Option<GovDispatch>> {
        self.store.get(GOV_DISPATCH_TABLE, &key.0).await
    }

    /// Every `GovTask` not yet in its terminal state, the governance
    /// loop's per-tick candidate set.
    pub async fn list_pending(&self) -> StorageResult<Vec<GovTask>> {
        let mut response = self
            .store
            .db()
            .client()
            .query("SELECT * FROM gov_task WHERE state != 'DONE'")
            .await
            .map_err(StorageError::from)?;
        let tasks: Vec<GovTask> = response.take(0).map_err(StorageError::from)?;
        Ok(tasks)
    }

    /// Count `GovTask`s currently `DOING` with `assigned_group == group`,
    /// the governance loop's per-group WIP bound check.
    pub async fn count_doing_for_group(&self, group: &str) -> StorageResult<u32> {
        let tasks: Vec<GovTask> = self
            .store
            .db()
            .client()
            .select(GOV_TASK_TABLE)
            .await
            .map_err(StorageError::from)?;
        Ok(tasks
            .into_iter()
            .filter(|t| t.state == GovState::Doing && t.assigned_group.as_deref() == Some(group))
            .count() as u32)
    }

    /// All dispatch records ever claimed for a given worker, most recent
    /// first (`/ops/workers/:id/dispatches`).
    pub async fn list_dispatches_for_worker(
        &self,
        worker_id: &nanoclaw_core::WorkerId,
    ) -> StorageResult<Vec<GovDispatch>> {
        let mut response = self
            .store
            .db()
            .client()
            .query("SELECT * FROM gov_dispatch WHERE worker_id = $worker_id ORDER BY created_at DESC")
            .bind(("worker_id", worker_id.0.clone()))
            .await
            .map_err(StorageError::from)?;
        let dispatches: Vec<GovDispatch> = response.take(0).map_err(StorageError::from)?;
        Ok(dispatches)
    }

    /// Full task listing for the ops API, optionally filtered by state,
    /// task type, and/or product id. Filters combine with AND.
    pub async fn list_filtered(
        &self,
        state: Option<GovState>,
        task_type: Option<&str>,
        product_id: Option<&ProductId>,
    ) -> StorageResult<Vec<GovTask>> {
        let tasks: Vec<GovTask> = self
            .store
            .db()
            .client()
            .select(GOV_TASK_TABLE)
            .await
            .map_err(StorageError::from)?;
        Ok(tasks
            .into_iter()
            .filter(|t| state.is_none_or(|s| t.state == s))
            .filter(|t| task_type.is_none_or(|ty| t.task_type == ty))
            .filter(|t| product_id.is_none_or(|p| t.product_id.as_ref() == Some(p)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::kv::MemoryKvStore;
    use chrono::Utc;
    use nanoclaw_core::{DispatchStatus, GovScope, GovState};
    use serde_json::json;
    use std::sync::Arc;

    async fn store() -> Store {
        let db = Database::connect_memory().await.unwrap();
        Store::new(db, Arc::new(MemoryKvStore::new()))
    }

    fn sample_task() -> GovTask {
        GovTask {
            id: GovTaskId::new("T"),
            title: "fix bug".to_string(),
            description: "...".to_string(),
            task_type: "bug".to_string(),
            state: GovState::Ready,
            priority: 0,
            product_id: None,
            scope: GovScope::Company,
            assigned_group: Some("developer".to_string()),
            gate: None,
            version: 4,
            metadata: json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_cas_update_bumps_version() {
        let store = store().await;
        let repo = GovernanceRepository::new(&store);
        let task = sample_task();
        repo.upsert(&task).await.unwrap();

        let updated = repo
            .cas_update(&task.id, 4, |mut t| {
                t.state = GovState::Doing;
                t
            })
            .await
            .unwrap();
        assert_eq!(updated.version, 5);
        assert_eq!(updated.state, GovState::Doing);
    }

    #[tokio::test]
    async fn test_only_one_dispatch_claim_wins() {
        let store = store().await;
        let repo = GovernanceRepository::new(&store);
        let task = sample_task();
        let dispatch_key = DispatchKey::build(&task.id, "READY", "DOING", task.version);

        let dispatch = GovDispatch {
            task_id: task.id.clone(),
            from_state: GovState::Ready,
            to_state: GovState::Doing,
            dispatch_key: dispatch_key.clone(),
            group_target: "developer".to_string(),
            worker_id: None,
            status: DispatchStatus::Enqueued,
            created_at: Utc::now(),
            sent_at: None,
            completed_at: None,
        };

        repo.claim_dispatch(&dispatch).await.unwrap();
        let second_attempt = repo.claim_dispatch(&dispatch).await;
        assert!(matches!(
            second_attempt,
            Err(StorageError::AlreadyClaimed(_))
        ));
    }

    #[tokio::test]
    async fn test_approval_unique_per_gate() {
        let store = store().await;
        let repo = GovernanceRepository::new(&store);
        let approval = GovApproval {
            task_id: GovTaskId::new("T"),
            gate_type: "Security".to_string(),
            approved_by: "alice".to_string(),
            approved_at: Utc::now(),
            notes: None,
        };

        repo.record_approval(&approval).await.unwrap();
        let dup = repo.record_approval(&approval).await;
        assert!(matches!(dup, Err(StorageError::AlreadyClaimed(_))));

        let fetched = repo
            .get_approval(&approval.task_id, "Security")
            .await
            .unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn test_activities_round_trip_in_order() {
        let store = store().await;
        let repo = GovernanceRepository::new(&store);
        let task_id = GovTaskId::new("T");

        for action in ["create", "transition"] {
            repo.append_activity(&GovActivity {
                task_id: task_id.clone(),
                action: action.to_string(),
                from_state: None,
                to_state: None,
                actor: "system".to_string(),
                reason: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        }

        let activities = repo.activities_for(&task_id).await.unwrap();
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].action, "create");
        assert_eq!(activities[1].action, "transition");
    }

    #[tokio::test]
    async fn test_list_pending_excludes_done() {
        let store = store().await;
        let repo = GovernanceRepository::new(&store);

        let mut done_task = sample_task();
        done_task.id = GovTaskId::new("T-done");
        done_task.state = GovState::Done;
        repo.upsert(&done_task).await.unwrap();
        repo.upsert(&sample_task()).await.unwrap();

        let pending = repo.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, GovTaskId::new("T"));
    }

    #[tokio::test]
    async fn test_list_filtered_by_task_type_and_product() {
        let store = store().await;
        let repo = GovernanceRepository::new(&store);

        let mut product_task = sample_task();
        product_task.id = GovTaskId::new("T-product");
        product_task.product_id = Some(ProductId::new("alpha"));
        repo.upsert(&product_task).await.unwrap();
        repo.upsert(&sample_task()).await.unwrap();

        let filtered = repo
            .list_filtered(None, None, Some(&ProductId::new("alpha")))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, GovTaskId::new("T-product"));
    }

    #[tokio::test]
    async fn test_list_dispatches_for_worker() {
        let store = store().await;
        let repo = GovernanceRepository::new(&store);
        let task = sample_task();
        let dispatch_key = DispatchKey::build(&task.id, "READY", "DOING", task.version);

        let dispatch = GovDispatch {
            task_id: task.id.clone(),
            from_state: GovState::Ready,
            to_state: GovState::Doing,
            dispatch_key,
            group_target: "developer".to_string(),
            worker_id: Some(nanoclaw_core::WorkerId::new("w1")),
            status: DispatchStatus::Sent,
            created_at: Utc::now(),
            sent_at: Some(Utc::now()),
            completed_at: None,
        };
        repo.claim_dispatch(&dispatch).await.unwrap();

        let for_w1 = repo
            .list_dispatches_for_worker(&nanoclaw_core::WorkerId::new("w1"))
            .await
            .unwrap();
        assert_eq!(for_w1.len(), 1);

        let for_w2 = repo
            .list_dispatches_for_worker(&nanoclaw_core::WorkerId::new("w2"))
            .await
            .unwrap();
        assert!(for_w2.is_empty());
    }
}

//! `INBOX -> READY` triage (spec.md §4.G): a human/API decision that
//! assigns a task to a worker group before the tick loop may dispatch it.

use nanoclaw_core::{GovState, GovTask, GovTaskId};
use nanoclaw_storage::GovernanceRepository;

use crate::error::{GovernanceError, GovernanceResult};
use crate::transitions;

/// Move `task_id` from `INBOX` to `READY`, assigning it to `group`.
///
/// # Errors
/// Returns [`GovernanceError::InvalidTransition`] if the task is not
/// currently `INBOX`.
pub async fn triage<'a>(
    repo: &GovernanceRepository<'a>,
    task_id: &GovTaskId,
    group: String,
    actor: &str,
) -> GovernanceResult<GovTask> {
    let task = repo
        .get(task_id)
        .await?
        .ok_or_else(|| nanoclaw_storage::StorageError::NotFound(task_id.to_string()))?;

    if task.state != GovState::Inbox {
        return Err(GovernanceError::InvalidTransition {
            task_id: task_id.to_string(),
            from: task.state.as_wire_str().to_string(),
            to: GovState::Ready.as_wire_str().to_string(),
        });
    }

    let assigned = repo
        .cas_update(task_id, task.version, |mut t| {
            t.assigned_group = Some(group.clone());
            t
        })
        .await?;

    transitions::apply(repo, &assigned, GovState::Ready, actor, None).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanoclaw_core::GovScope;
    use nanoclaw_storage::db::Database;
    use nanoclaw_storage::kv::MemoryKvStore;
    use nanoclaw_storage::store::Store;
    use serde_json::json;

    async fn store() -> Store {
        let db = Database::connect_memory().await.unwrap();
        Store::new(db, std::sync::Arc::new(MemoryKvStore::new()))
    }

    fn sample_task() -> GovTask {
        GovTask {
            id: GovTaskId::new("T"),
            title: "fix bug".to_string(),
            description: "...".to_string(),
            task_type: "bug".to_string(),
            state: GovState::Inbox,
            priority: 0,
            product_id: None,
            scope: GovScope::Company,
            assigned_group: None,
            gate: None,
            version: 0,
            metadata: json!({}),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_triage_assigns_group_and_moves_to_ready() {
        let store = store().await;
        let repo = GovernanceRepository::new(&store);
        let task = sample_task();
        repo.upsert(&task).await.unwrap();

        let updated = triage(&repo, &task.id, "developer".to_string(), "alice")
            .await
            .unwrap();
        assert_eq!(updated.state, GovState::Ready);
        assert_eq!(updated.assigned_group.as_deref(), Some("developer"));
    }

    #[tokio::test]
    async fn test_triage_rejects_non_inbox_task() {
        let store = store().await;
        let repo = GovernanceRepository::new(&store);
        let mut task = sample_task();
        task.state = GovState::Ready;
        repo.upsert(&task).await.unwrap();

        let err = triage(&repo, &task.id, "developer".to_string(), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::InvalidTransition { .. }));
    }
}

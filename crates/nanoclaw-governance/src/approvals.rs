//! Recording gate approvals (spec.md §4.G, `APPROVAL -> DONE`). Exposed
//! for the Ops HTTP API's approve action; the tick loop also re-checks
//! outstanding approvals independently, so a missed immediate transition
//! here is still picked up on the next tick.

use chrono::Utc;
use nanoclaw_core::{GovApproval, GovState, GovTask, GovTaskId};
use nanoclaw_storage::GovernanceRepository;

use crate::error::{GovernanceError, GovernanceResult};
use crate::transitions;

/// Record an approval for `task_id`'s current gate and, if the task is
/// sitting in `APPROVAL` waiting on exactly this gate, transition it to
/// `DONE` immediately.
///
/// # Errors
/// Returns [`GovernanceError::GateNotApproved`] if `gate_type` does not
/// match the task's configured gate.
pub async fn approve<'a>(
    repo: &GovernanceRepository<'a>,
    task_id: &GovTaskId,
    gate_type: &str,
    approved_by: &str,
    notes: Option<String>,
) -> GovernanceResult<GovTask> {
    let task = repo
        .get(task_id)
        .await?
        .ok_or_else(|| nanoclaw_storage::StorageError::NotFound(task_id.to_string()))?;

    if task.gate.as_deref() != Some(gate_type) {
        return Err(GovernanceError::GateNotApproved {
            task_id: task_id.to_string(),
            gate: gate_type.to_string(),
        });
    }

    repo.record_approval(&GovApproval {
        task_id: task_id.clone(),
        gate_type: gate_type.to_string(),
        approved_by: approved_by.to_string(),
        approved_at: Utc::now(),
        notes,
    })
    .await?;

    if task.state == GovState::Approval {
        return transitions::apply(repo, &task, GovState::Done, approved_by, None).await;
    }
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanoclaw_core::GovScope;
    use nanoclaw_storage::db::Database;
    use nanoclaw_storage::kv::MemoryKvStore;
    use nanoclaw_storage::store::Store;
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
            state: GovState::Approval,
            priority: 0,
            product_id: None,
            scope: GovScope::Company,
            assigned_group: Some("developer".to_string()),
            gate: Some("Security".to_string()),
            version: 3,
            metadata: json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_approve_transitions_approval_to_done() {
        let store = store().await;
        let repo = GovernanceRepository::new(&store);
        let task = sample_task();
        repo.upsert(&task).await.unwrap();

        let updated = approve(&repo, &task.id, "Security", "alice", None)
            .await
            .unwrap();
        assert_eq!(updated.state, GovState::Done);
    }

    #[tokio::test]
    async fn test_approve_rejects_mismatched_gate() {
        let store = store().await;
        let repo = GovernanceRepository::new(&store);
        let task = sample_task();
        repo.upsert(&task).await.unwrap();

        let err = approve(&repo, &task.id, "Legal", "alice", None)
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::GateNotApproved { .. }));
    }

    #[tokio::test]
    async fn test_approve_duplicate_fails_uniqueness() {
        let store = store().await;
        let repo = GovernanceRepository::new(&store);
        let task = sample_task();
        repo.upsert(&task).await.unwrap();

        approve(&repo, &task.id, "Security", "alice", None)
            .await
            .unwrap();

        let reloaded = repo.get(&task.id).await.unwrap().unwrap();
        assert_eq!(reloaded.state, GovState::Done);

        let err = approve(&repo, &task.id, "Security", "bob", None)
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::Storage(_)));
    }
}

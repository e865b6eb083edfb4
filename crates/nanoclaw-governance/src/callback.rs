//! Handling for `POST /ops/worker/completion` (spec.md §4.G,
//! `DOING -> REVIEW`). Released separately from the tick loop since it
//! fires on an inbound worker callback, not on a timer.

use nanoclaw_core::{CompletionCallback, CompletionStatus, GovActivity, GovState, GovTask, WorkerId};
use nanoclaw_dispatch::WorkerDispatcher;
use nanoclaw_storage::GovernanceRepository;
use tracing::info;

use crate::error::GovernanceResult;
use crate::transitions;

/// Apply a worker's completion callback: release its WIP capacity,
/// record the execution summary as an activity, and transition the task
/// `DOING -> REVIEW` regardless of whether the worker reported success
/// or failure (review is where a human/gate decides what happens next).
pub async fn apply_completion<'a>(
    repo: &GovernanceRepository<'a>,
    dispatcher: &WorkerDispatcher,
    worker_id: &WorkerId,
    callback: &CompletionCallback,
) -> GovernanceResult<GovTask> {
    dispatcher.release(worker_id).await?;

    let Some(task) = repo.get(&callback.task_id).await? else {
        return Err(nanoclaw_storage::StorageError::NotFound(callback.task_id.to_string()).into());
    };

    if task.state != GovState::Doing {
        info!(task_id = %task.id, state = ?task.state, "completion callback for task not in DOING, ignoring transition");
        return Ok(task);
    }

    repo.append_activity(&GovActivity {
        task_id: task.id.clone(),
        action: "execution_summary".to_string(),
        from_state: None,
        to_state: None,
        actor: worker_id.to_string(),
        reason: callback.summary.clone().or_else(|| {
            Some(match callback.status {
                CompletionStatus::Success => "completed successfully".to_string(),
                CompletionStatus::Failure => "execution failed".to_string(),
            })
        }),
        created_at: chrono::Utc::now(),
    })
    .await?;

    transitions::apply(repo, &task, GovState::Review, &worker_id.to_string(), None).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanoclaw_core::{GovScope, GroupFolder, Worker, WorkerStatus};
    use nanoclaw_dispatch::WorkerHttpClient;
    use nanoclaw_storage::db::Database;
    use nanoclaw_storage::kv::MemoryKvStore;
    use nanoclaw_storage::store::Store;
    use nanoclaw_storage::WorkerRepository;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    async fn store() -> Arc<Store> {
        let db = Database::connect_memory().await.unwrap();
        Arc::new(Store::new(db, Arc::new(MemoryKvStore::new())))
    }

    fn sample_task(state: GovState) -> GovTask {
        GovTask {
            id: nanoclaw_core::GovTaskId::new("T"),
            title: "fix bug".to_string(),
            description: "...".to_string(),
            task_type: "bug".to_string(),
            state,
            priority: 0,
            product_id: None,
            scope: GovScope::Company,
            assigned_group: Some("developer".to_string()),
            gate: None,
            version: 2,
            metadata: json!({}),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn worker(id: &str) -> Worker {
        Worker {
            id: WorkerId::new(id),
            host: "10.0.0.1".to_string(),
            user: "nanoclaw".to_string(),
            ssh_port: 22,
            local_port: 9999,
            remote_port: 8080,
            status: WorkerStatus::Online,
            max_wip: 2,
            current_wip: 1,
            shared_secret: "secret".to_string(),
            groups_served: vec!["developer".to_string()],
            consecutive_failures: 0,
        }
    }

    #[tokio::test]
    async fn test_completion_moves_doing_to_review_and_releases_wip() {
        let store = store().await;
        let repo = GovernanceRepository::new(&store);
        let task = sample_task(GovState::Doing);
        repo.upsert(&task).await.unwrap();

        let workers = WorkerRepository::new(&store);
        workers.upsert(&worker("w1")).await.unwrap();

        let dispatcher = WorkerDispatcher::new(store.clone(), WorkerHttpClient::new(Duration::from_millis(50)));
        let callback = CompletionCallback {
            task_id: task.id.clone(),
            group_folder: GroupFolder::new("developer"),
            status: CompletionStatus::Success,
            summary: Some("done".to_string()),
        };

        let updated = apply_completion(&repo, &dispatcher, &WorkerId::new("w1"), &callback)
            .await
            .unwrap();
        assert_eq!(updated.state, GovState::Review);

        let reloaded_worker = workers.get(&WorkerId::new("w1")).await.unwrap().unwrap();
        assert_eq!(reloaded_worker.current_wip, 0);
    }

    #[tokio::test]
    async fn test_completion_ignores_task_not_in_doing() {
        let store = store().await;
        let repo = GovernanceRepository::new(&store);
        let task = sample_task(GovState::Review);
        repo.upsert(&task).await.unwrap();

        let dispatcher = WorkerDispatcher::new(store.clone(), WorkerHttpClient::new(Duration::from_millis(50)));
        let callback = CompletionCallback {
            task_id: task.id.clone(),
            group_folder: GroupFolder::new("developer"),
            status: CompletionStatus::Success,
            summary: None,
        };

        let updated = apply_completion(&repo, &dispatcher, &WorkerId::new("w1"), &callback)
            .await
            .unwrap();
        assert_eq!(updated.state, GovState::Review);
        assert_eq!(updated.version, 2);
    }
}

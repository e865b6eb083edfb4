//! The scheduler tick loop (spec.md §4.F).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use nanoclaw_core::Task;
use nanoclaw_router::agent::{AgentClient, AgentStatus, AgentTurnRequest, TurnMode};
use nanoclaw_router::lock::AgentLock;
use nanoclaw_storage::store::Store;
use nanoclaw_storage::tasks::TaskRepository;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::error::SchedulerResult;
use crate::schedule::{apply_failure, apply_success};

/// Everything the scheduler loop needs per tick.
pub struct SchedulerDeps {
    /// Persistent store.
    pub store: Arc<Store>,
    /// Agent turn client, shared with the router.
    pub agent: Arc<dyn AgentClient>,
    /// Process-wide agent lock, shared with the router.
    pub lock: AgentLock,
    /// Timezone used for cron evaluation.
    pub timezone: String,
    /// Retries allowed before a task moves to the failed sentinel state.
    pub max_attempts: u32,
}

/// Run the scheduler loop until `shutdown` fires, ticking every
/// `poll_interval`.
pub async fn run_scheduler_loop(
    deps: Arc<SchedulerDeps>,
    poll_interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => {
                info!("scheduler loop shutting down");
                return;
            }
            _ = ticker.tick() => {
                if let Err(err) = process_tick(&deps).await {
                    warn!(error = %err, "scheduler tick failed");
                }
            }
        }
    }
}

/// Fire every due task once, deferring to the next tick (never queuing)
/// whenever the agent lock is already held.
async fn process_tick(deps: &Arc<SchedulerDeps>) -> SchedulerResult<()> {
    let repo = TaskRepository::new(&deps.store);
    let due = repo.due_at(Utc::now()).await?;

    for mut task in due {
        if !deps.lock.acquire() {
            continue;
        }
        let result = run_one_task(deps, &mut task).await;
        deps.lock.release();

        if let Err(err) = result {
            warn!(task_id = %task.task_id, error = %err, "scheduled task run failed");
        }
        repo.upsert(&task).await?;
    }

    Ok(())
}

async fn run_one_task(deps: &Arc<SchedulerDeps>, task: &mut Task) -> SchedulerResult<()> {
    let prompt = TurnMode::Scheduled.label(&task.prompt);

    let mut stream = deps
        .agent
        .run_turn(AgentTurnRequest {
            prompt,
            session_id: None,
            mode: TurnMode::Scheduled,
        })
        .await;

    let mut failure = None;
    while let Some(event) = stream.next().await {
        match event.status {
            AgentStatus::Running => continue,
            AgentStatus::Done => break,
            AgentStatus::Error => {
                failure = Some(event.error.unwrap_or_else(|| "agent error".to_string()));
                break;
            }
        }
    }

    match failure {
        Some(message) => {
            apply_failure(task, deps.max_attempts);
            Err(crate::error::SchedulerError::AgentError(message))
        }
        None => {
            apply_success(task, Utc::now(), &deps.timezone)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream::{self, BoxStream};
    use nanoclaw_core::{ChatJid, ContextMode, ScheduleType, TaskId, TaskStatus};
    use nanoclaw_router::agent::AgentEvent;
    use nanoclaw_storage::db::Database;
    use nanoclaw_storage::kv::MemoryKvStore;

    struct ScriptedAgent {
        events: Vec<AgentEvent>,
    }

    #[async_trait]
    impl AgentClient for ScriptedAgent {
        async fn run_turn(&self, _request: AgentTurnRequest) -> BoxStream<'static, AgentEvent> {
            stream::iter(self.events.clone()).boxed()
        }
    }

    fn make_deps(agent: ScriptedAgent) -> Arc<SchedulerDeps> {
        Arc::new(SchedulerDeps {
            store: Arc::new(Store::new(
                futures::executor::block_on(Database::connect_memory()).unwrap(),
                Arc::new(MemoryKvStore::new()),
            )),
            agent: Arc::new(agent),
            lock: AgentLock::new(),
            timezone: "UTC".to_string(),
            max_attempts: 3,
        })
    }

    fn due_task(id: &str) -> Task {
        Task {
            task_id: TaskId::new(id),
            chat_jid: ChatJid::new("chat-1"),
            prompt: "say hi".to_string(),
            schedule_type: ScheduleType::Interval,
            schedule_value: "60000".to_string(),
            context_mode: ContextMode::Chat,
            next_run: Some(Utc::now() - chrono::Duration::seconds(1)),
            last_run: None,
            status: TaskStatus::Active,
            failed_attempts: 0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_tick_fires_due_task_and_advances_next_run() {
        let deps = make_deps(ScriptedAgent {
            events: vec![AgentEvent::done(Some("ok".to_string()), None)],
        });
        let repo = TaskRepository::new(&deps.store);
        let task = due_task("t1");
        let prior_next_run = task.next_run;
        repo.upsert(&task).await.unwrap();

        process_tick(&deps).await.unwrap();

        let reloaded = repo.get(&task.task_id).await.unwrap().unwrap();
        assert!(reloaded.next_run > prior_next_run);
        assert_eq!(reloaded.status, TaskStatus::Active);
        assert!(!deps.lock.is_held());
    }

    #[tokio::test]
    async fn test_tick_bumps_retry_counter_on_failure() {
        let deps = make_deps(ScriptedAgent {
            events: vec![AgentEvent::error("boom")],
        });
        let repo = TaskRepository::new(&deps.store);
        let task = due_task("t1");
        repo.upsert(&task).await.unwrap();

        process_tick(&deps).await.unwrap();

        let reloaded = repo.get(&task.task_id).await.unwrap().unwrap();
        assert_eq!(reloaded.failed_attempts, 1);
        assert_eq!(reloaded.status, TaskStatus::Active);
    }

    #[tokio::test]
    async fn test_tick_fails_task_after_exhausting_retry_budget() {
        let deps = make_deps(ScriptedAgent {
            events: vec![AgentEvent::error("boom")],
        });
        let repo = TaskRepository::new(&deps.store);
        let mut task = due_task("t1");
        task.failed_attempts = 2;
        repo.upsert(&task).await.unwrap();

        process_tick(&deps).await.unwrap();

        let reloaded = repo.get(&task.task_id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, TaskStatus::Failed);
        assert_eq!(reloaded.next_run, None);
    }

    #[tokio::test]
    async fn test_tick_skips_task_when_lock_held() {
        let deps = make_deps(ScriptedAgent {
            events: vec![AgentEvent::done(Some("ok".to_string()), None)],
        });
        let repo = TaskRepository::new(&deps.store);
        let task = due_task("t1");
        let prior_next_run = task.next_run;
        repo.upsert(&task).await.unwrap();

        assert!(deps.lock.acquire());
        process_tick(&deps).await.unwrap();
        deps.lock.release();

        let reloaded = repo.get(&task.task_id).await.unwrap().unwrap();
        assert_eq!(reloaded.next_run, prior_next_run);
    }

    #[tokio::test]
    async fn test_once_task_completes_after_firing() {
        let deps = make_deps(ScriptedAgent {
            events: vec![AgentEvent::done(Some("ok".to_string()), None)],
        });
        let repo = TaskRepository::new(&deps.store);
        let mut task = due_task("t1");
        task.schedule_type = ScheduleType::Once;
        repo.upsert(&task).await.unwrap();

        process_tick(&deps).await.unwrap();

        let reloaded = repo.get(&task.task_id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, TaskStatus::Completed);
        assert_eq!(reloaded.next_run, None);
    }
}

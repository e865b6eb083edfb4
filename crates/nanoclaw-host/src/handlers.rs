//! Concrete [`TaskHandler`] registrations for the agent-facing `tasks/`
//! pipeline (spec.md §4.C): schedule/cancel against the task store,
//! memory broker calls, and limits-gated external calls.
//!
//! `register`/`trello`/`slack` are deliberately left unregistered - they
//! name external integrations out of scope for this core (spec.md §1
//! Non-goals), and `nanoclaw_ipc::handlers::run_handler` already answers
//! an unregistered kind with a clean `BAD_REQUEST` response rather than
//! quarantining or panicking.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use nanoclaw_core::{ChatJid, ContextMode, GroupFolder, MemoryLevel, ProductId, ScheduleType, Task, TaskId, TaskStatus};
use nanoclaw_ipc::{require_field, require_main, IpcError, IpcResult, IpcTask, TaskHandler};
use nanoclaw_limits::{LimitContext, LimitsConfig, LimitsEngine};
use nanoclaw_memory::MemoryBroker;
use nanoclaw_storage::{LimitsRepository, MemoryRepository, Store, TaskRepository};
use serde_json::{json, Value};
use uuid::Uuid;

/// Schedules and reschedules `nanoclaw-scheduler` tasks on behalf of an
/// agent session.
pub struct ScheduleHandler {
    /// Persistent store.
    pub store: Arc<Store>,
    /// IANA timezone used to evaluate cron/interval schedules.
    pub timezone: String,
}

#[async_trait]
impl TaskHandler for ScheduleHandler {
    fn authorize(&self, _task: &IpcTask) -> IpcResult<()> {
        Ok(())
    }

    fn validate(&self, task: &IpcTask) -> IpcResult<()> {
        require_field(task, "prompt")?;
        require_field(task, "schedule_type")?;
        require_field(task, "schedule_value")?;
        Ok(())
    }

    async fn execute(&self, group: &str, task: &IpcTask) -> IpcResult<Value> {
        let prompt = require_field(task, "prompt")?
            .as_str()
            .ok_or_else(|| IpcError::BadRequest("`prompt` must be a string".to_string()))?
            .to_string();
        let schedule_type = parse_schedule_type(require_field(task, "schedule_type")?)?;
        let schedule_value = require_field(task, "schedule_value")?
            .as_str()
            .ok_or_else(|| IpcError::BadRequest("`schedule_value` must be a string".to_string()))?
            .to_string();
        let context_mode = match task.payload.get("context_mode") {
            Some(value) => parse_context_mode(value)?,
            None => ContextMode::Chat,
        };
        let chat_jid = task
            .payload
            .get("chat_jid")
            .and_then(Value::as_str)
            .unwrap_or(group)
            .to_string();

        let now = Utc::now();
        let next_run = match schedule_type {
            ScheduleType::Once => Some(parse_rfc3339(&schedule_value)?),
            ScheduleType::Interval | ScheduleType::Cron => {
                let probe = Task {
                    task_id: TaskId::new("probe"),
                    chat_jid: ChatJid::new(chat_jid.clone()),
                    prompt: prompt.clone(),
                    schedule_type,
                    schedule_value: schedule_value.clone(),
                    context_mode,
                    next_run: None,
                    last_run: None,
                    status: TaskStatus::Active,
                    failed_attempts: 0,
                    created_at: now,
                };
                nanoclaw_scheduler::next_run_after(&probe, now, &self.timezone)
                    .map_err(|error| IpcError::BadRequest(error.to_string()))?
            }
        };

        let task_id = task
            .payload
            .get("task_id")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let scheduled = Task {
            task_id: TaskId::new(task_id.clone()),
            chat_jid: ChatJid::new(chat_jid),
            prompt,
            schedule_type,
            schedule_value,
            context_mode,
            next_run,
            last_run: None,
            status: TaskStatus::Active,
            failed_attempts: 0,
            created_at: now,
        };

        let repo = TaskRepository::new(&self.store);
        repo.upsert(&scheduled).await.map_err(|error| IpcError::BadRequest(error.to_string()))?;

        Ok(json!({"task_id": task_id, "next_run": next_run}))
    }
}

fn parse_schedule_type(value: &Value) -> IpcResult<ScheduleType> {
    serde_json::from_value(value.clone())
        .map_err(|_| IpcError::BadRequest("`schedule_type` must be one of cron/interval/once".to_string()))
}

fn parse_context_mode(value: &Value) -> IpcResult<ContextMode> {
    serde_json::from_value(value.clone())
        .map_err(|_| IpcError::BadRequest("`context_mode` must be chat/isolated".to_string()))
}

fn parse_rfc3339(value: &str) -> IpcResult<chrono::DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| IpcError::BadRequest(format!("'{value}' is not a valid RFC 3339 instant")))
}

/// Cancels a previously scheduled task, idempotently.
pub struct CancelHandler {
    /// Persistent store.
    pub store: Arc<Store>,
}

#[async_trait]
impl TaskHandler for CancelHandler {
    fn authorize(&self, _task: &IpcTask) -> IpcResult<()> {
        Ok(())
    }

    fn validate(&self, task: &IpcTask) -> IpcResult<()> {
        require_field(task, "task_id")?;
        Ok(())
    }

    async fn execute(&self, _group: &str, task: &IpcTask) -> IpcResult<Value> {
        let task_id = require_field(task, "task_id")?
            .as_str()
            .ok_or_else(|| IpcError::BadRequest("`task_id` must be a string".to_string()))?;

        let repo = TaskRepository::new(&self.store);
        let id = TaskId::new(task_id);
        let Some(mut existing) = repo.get(&id).await.map_err(|error| IpcError::BadRequest(error.to_string()))? else {
            return Ok(json!({"cancelled": false, "reason": "no such task"}));
        };
        existing.status = TaskStatus::Completed;
        existing.next_run = None;
        repo.upsert(&existing).await.map_err(|error| IpcError::BadRequest(error.to_string()))?;
        Ok(json!({"cancelled": true}))
    }
}

/// `mem_store`/`mem_recall` over the [`MemoryBroker`].
pub struct MemoryHandler {
    /// Persistent store.
    pub store: Arc<Store>,
    /// The privileged group, required for explicit L3 writes.
    pub main_group: GroupFolder,
}

#[async_trait]
impl TaskHandler for MemoryHandler {
    fn authorize(&self, task: &IpcTask) -> IpcResult<()> {
        if task.payload.get("level").and_then(Value::as_str) == Some("L3") {
            require_main(task, "mem_store with level L3")?;
        }
        Ok(())
    }

    fn validate(&self, task: &IpcTask) -> IpcResult<()> {
        match task.payload.get("operation").and_then(Value::as_str) {
            Some("store") => {
                require_field(task, "content")?;
                require_field(task, "scope")?;
            }
            Some("recall") => {
                require_field(task, "query")?;
            }
            _ => {
                return Err(IpcError::BadRequest(
                    "`operation` must be `store` or `recall`".to_string(),
                ))
            }
        }
        Ok(())
    }

    async fn execute(&self, group: &str, task: &IpcTask) -> IpcResult<Value> {
        let repo = MemoryRepository::new(&self.store);
        let broker = MemoryBroker::new(repo, self.main_group.clone());
        let caller_group = GroupFolder::new(group);
        let now = Utc::now();

        match task.payload.get("operation").and_then(Value::as_str) {
            Some("store") => {
                let content = require_field(task, "content")?
                    .as_str()
                    .ok_or_else(|| IpcError::BadRequest("`content` must be a string".to_string()))?
                    .to_string();
                let scope = require_field(task, "scope")?
                    .as_str()
                    .ok_or_else(|| IpcError::BadRequest("`scope` must be a string".to_string()))?
                    .to_string();
                let level = match task.payload.get("level") {
                    Some(value) => Some(
                        serde_json::from_value::<MemoryLevel>(value.clone())
                            .map_err(|_| IpcError::BadRequest("`level` must be L1/L2/L3".to_string()))?,
                    ),
                    None => None,
                };
                let product_id = task.payload.get("product_id").and_then(Value::as_str).map(ProductId::new);
                let group_folder = task
                    .payload
                    .get("group_folder")
                    .and_then(Value::as_str)
                    .map(GroupFolder::new)
                    .unwrap_or_else(|| caller_group.clone());
                let tags = task
                    .payload
                    .get("tags")
                    .and_then(Value::as_array)
                    .map(|values| values.iter().filter_map(Value::as_str).map(ToString::to_string).collect())
                    .unwrap_or_default();

                let memory = broker
                    .store(&caller_group, content, level, scope, product_id, group_folder, tags, now)
                    .await
                    .map_err(|error| IpcError::Unauthorized(error.to_string()))?;
                Ok(serde_json::to_value(memory).expect("Memory serializes"))
            }
            Some("recall") => {
                let query = require_field(task, "query")?
                    .as_str()
                    .ok_or_else(|| IpcError::BadRequest("`query` must be a string".to_string()))?;
                let product_id = task.payload.get("product_id").and_then(Value::as_str).map(ProductId::new);
                let limit = task.payload.get("limit").and_then(Value::as_u64).unwrap_or(10) as usize;

                let memories = broker
                    .recall(&caller_group, query, product_id.as_ref(), limit, now)
                    .await
                    .map_err(|error| IpcError::BadRequest(error.to_string()))?;
                Ok(json!({"memories": memories}))
            }
            _ => unreachable!("validated above"),
        }
    }
}

/// Arbitrary outbound calls to an external service. The service itself
/// is an external collaborator (spec.md §1 Non-goals); this handler's
/// job is to enforce the limits engine and report what would have run.
pub struct ExternalCallHandler {
    /// Persistent store.
    pub store: Arc<Store>,
    /// Limits engine configuration (rate limits, quotas, breaker ops).
    pub limits_config: Arc<LimitsConfig>,
}

#[async_trait]
impl TaskHandler for ExternalCallHandler {
    fn authorize(&self, _task: &IpcTask) -> IpcResult<()> {
        Ok(())
    }

    fn validate(&self, task: &IpcTask) -> IpcResult<()> {
        require_field(task, "provider")?;
        Ok(())
    }

    async fn execute(&self, group: &str, task: &IpcTask) -> IpcResult<Value> {
        let provider = require_field(task, "provider")?
            .as_str()
            .ok_or_else(|| IpcError::BadRequest("`provider` must be a string".to_string()))?
            .to_string();

        let repo = LimitsRepository::new(&self.store);
        let engine = LimitsEngine::new(repo, &self.limits_config);
        let context = LimitContext {
            scope_key: group.to_string(),
            provider: Some(provider.clone()),
        };
        let decision = engine
            .enforce("ext_call", &context, Utc::now())
            .await
            .map_err(|error| IpcError::BadRequest(error.to_string()))?;

        if !decision.allowed {
            let code = decision.code.map(|c| c.as_wire_str()).unwrap_or("DENIED");
            return Err(IpcError::Unauthorized(format!("{code}: {}", decision.detail.unwrap_or_default())));
        }

        Ok(json!({
            "forwarded": false,
            "provider": provider,
            "message": "no external call executor is configured for this host",
        }))
    }
}

//! On-disk IPC snapshot file formats (spec.md §4.C, §6): `current_tasks.json`,
//! `gov_pipeline.json`, and `ext_capabilities.json`. These are periodic,
//! read-only views a group's agent worker polls from its IPC directory;
//! [`nanoclaw_ipc`](../nanoclaw_ipc/index.html)'s `snapshot` module writes
//! them atomically, the host's snapshot job refreshes them on a timer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChatJid, TaskId};
use crate::task::{ScheduleType, Task, TaskStatus};

/// One entry of `current_tasks.json`, matching spec.md §6's wire shape
/// (`camelCase` field names, unlike the rest of the host's `snake_case`
/// internal JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTaskEntry {
    /// Task identifier.
    pub id: TaskId,
    /// Chat this task's prompt runs against.
    pub chat_jid: ChatJid,
    /// Prompt text given to the agent when the task fires.
    pub prompt: String,
    /// How the schedule is evaluated.
    pub schedule_type: ScheduleType,
    /// Cron expression, millisecond interval, or ISO-8601 instant.
    pub schedule_value: String,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// Next scheduled fire time, if any.
    pub next_run: Option<DateTime<Utc>>,
}

impl From<&Task> for CurrentTaskEntry {
    fn from(task: &Task) -> Self {
        Self {
            id: task.task_id.clone(),
            chat_jid: task.chat_jid.clone(),
            prompt: task.prompt.clone(),
            schedule_type: task.schedule_type,
            schedule_value: task.schedule_value.clone(),
            status: task.status,
            next_run: task.next_run,
        }
    }
}

/// Full `current_tasks.json` snapshot: a bare JSON array of
/// [`CurrentTaskEntry`], per spec.md §6.
pub type CurrentTasksSnapshot = Vec<CurrentTaskEntry>;

/// `gov_pipeline.json`: `{generatedAt, tasks: [...]}` (spec.md §6). The
/// per-task payload is deliberately untyped `serde_json::Value` here since
/// the snapshot is agent-facing read-only data, not round-tripped back
/// through this type; callers populate it from `ContextPack`/`GovTask`
/// JSON directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovPipelineSnapshot {
    /// When this snapshot was generated.
    pub generated_at: DateTime<Utc>,
    /// One entry per governed task visible to the receiving group.
    pub tasks: Vec<serde_json::Value>,
}

/// `ext_capabilities.json`: which IPC task kinds and external providers a
/// group's agent session is currently permitted to invoke, so the agent
/// can avoid issuing a request it already knows will be denied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtCapabilities {
    /// Whether this session carries the `isMain` capability (spec.md
    /// §4.C's `UNAUTHORIZED` gate, L3 memory access).
    pub is_main: bool,
    /// Whether external-provider calls are enabled host-wide.
    /// `EXT_CALLS_ENABLED`.
    pub ext_calls_enabled: bool,
    /// Whether embeddings calls are enabled host-wide.
    /// `EMBEDDINGS_ENABLED`.
    pub embeddings_enabled: bool,
    /// Named external providers this group may call (e.g. `"trello"`,
    /// `"slack"`), already filtered to what this group's worker
    /// configuration grants.
    pub providers: Vec<String>,
}

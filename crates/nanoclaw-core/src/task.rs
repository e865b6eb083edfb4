//! Scheduled task data model (owned by the Task Scheduler).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChatJid, TaskId};

/// How a task's `next_run` is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    /// Standard cron expression, evaluated in the configured timezone.
    Cron,
    /// Fixed millisecond interval from the last run.
    Interval,
    /// Fires exactly once, then completes.
    Once,
}

/// Whether a scheduled run shares the chat's ongoing session or starts
/// fresh.
///
/// The source data uses divergent naming for this field (`"group"` in some
/// callers, `"chat"` in others); both are accepted on deserialization and
/// canonicalized to `Chat` on every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextMode {
    /// Run inside the chat's ongoing session context.
    #[serde(rename = "chat", alias = "group")]
    Chat,
    /// Run with a fresh, isolated context.
    #[serde(rename = "isolated")]
    Isolated,
}

/// Lifecycle state of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Eligible to fire when `next_run` elapses.
    Active,
    /// Will not fire until reactivated.
    Paused,
    /// A `once` task that has already fired, or a task that exhausted its
    /// retry budget.
    Completed,
    /// Exceeded `max_attempts` consecutive failures; will not fire again
    /// without manual intervention.
    Failed,
}

/// A scheduled unit of agent work.
///
/// Invariant: `next_run` is `Some` iff `status == Active` and the task has
/// runs remaining; a `once` task becomes `Completed` after a successful
/// run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub task_id: TaskId,
    /// Chat this task's prompt runs against (context for `ContextMode::Chat`).
    pub chat_jid: ChatJid,
    /// Prompt text given to the agent when the task fires.
    pub prompt: String,
    /// How the schedule is evaluated.
    pub schedule_type: ScheduleType,
    /// Cron expression, millisecond interval, or ISO-8601 instant,
    /// depending on `schedule_type`.
    pub schedule_value: String,
    /// Whether the run shares the chat session or is isolated.
    pub context_mode: ContextMode,
    /// Next time this task should fire, if any.
    pub next_run: Option<DateTime<Utc>>,
    /// Last time this task fired, if ever.
    pub last_run: Option<DateTime<Utc>>,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// Consecutive failed attempts since the last success.
    #[serde(default)]
    pub failed_attempts: u32,
    /// When this task was created.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Whether this task currently obeys the "active implies has a
    /// `next_run`" invariant.
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        match self.status {
            TaskStatus::Active => self.next_run.is_some(),
            TaskStatus::Paused | TaskStatus::Completed | TaskStatus::Failed => true,
        }
    }
}

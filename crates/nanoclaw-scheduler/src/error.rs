//! Scheduler error types.

use thiserror::Error;

/// Errors surfaced by the scheduler loop or its components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The persisted store failed.
    #[error("storage error: {0}")]
    Storage(#[from] nanoclaw_storage::StorageError),

    /// A task's `schedule_value` did not parse for its `schedule_type`.
    #[error("invalid schedule for task {task_id}: {reason}")]
    InvalidSchedule {
        /// The offending task.
        task_id: String,
        /// Why it failed to parse.
        reason: String,
    },

    /// The agent's result stream ended with `status = error`.
    #[error("agent turn failed: {0}")]
    AgentError(String),
}

/// Result alias for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

//! Governance Loop error types.

use thiserror::Error;

/// Errors surfaced by the governance loop's transition and dispatch logic.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// The persisted store failed.
    #[error("storage error: {0}")]
    Storage(#[from] nanoclaw_storage::StorageError),

    /// A requested transition is not permitted by the state machine.
    #[error("transition {from}->{to} not permitted for task {task_id}")]
    InvalidTransition {
        /// The task the transition was attempted on.
        task_id: String,
        /// The state it was in.
        from: String,
        /// The state requested.
        to: String,
    },

    /// A `READY->DOING` transition was requested with no assigned group.
    #[error("task {task_id} has no assigned_group, cannot dispatch")]
    NoAssignedGroup {
        /// The task missing an assignment.
        task_id: String,
    },

    /// `APPROVAL->DONE` was requested without a matching recorded
    /// approval for the task's gate.
    #[error("task {task_id} gate {gate} has no recorded approval")]
    GateNotApproved {
        /// The task awaiting approval.
        task_id: String,
        /// The gate that has not been satisfied.
        gate: String,
    },

    /// The worker dispatcher failed to select or reach a worker.
    #[error("dispatch failed: {0}")]
    Dispatch(#[from] nanoclaw_dispatch::DispatchError),

    /// The memory broker failed while assembling a Context Pack.
    #[error("memory broker error: {0}")]
    Memory(#[from] nanoclaw_memory::MemoryError),
}

/// Result alias for governance operations.
pub type GovernanceResult<T> = Result<T, GovernanceError>;

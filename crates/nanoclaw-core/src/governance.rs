//! Governed work item data model (owned by the Governance Loop).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{DispatchKey, GovTaskId, GroupFolder, ProductId, WorkerId};

/// State machine position of a `GovTask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GovState {
    /// Newly created, awaiting a human/API triage decision.
    #[serde(rename = "INBOX")]
    Inbox,
    /// Triaged and assigned to a worker group, awaiting dispatch.
    #[serde(rename = "READY")]
    Ready,
    /// Dispatched to a worker and currently executing.
    #[serde(rename = "DOING")]
    Doing,
    /// Execution finished; awaiting review/gate evaluation.
    #[serde(rename = "REVIEW")]
    Review,
    /// Blocked on a named approval gate.
    #[serde(rename = "APPROVAL")]
    Approval,
    /// Terminal state.
    #[serde(rename = "DONE")]
    Done,
}

impl GovState {
    /// Wire name used in `dispatch_key` and activity logs.
    #[must_use]
    pub fn as_wire_str(self) -> &'static str {
        match self {
            Self::Inbox => "INBOX",
            Self::Ready => "READY",
            Self::Doing => "DOING",
            Self::Review => "REVIEW",
            Self::Approval => "APPROVAL",
            Self::Done => "DONE",
        }
    }

    /// Whether `to` is a permitted automatic or human transition from
    /// `self`, per spec.md §4.G's transition table. Founder overrides are
    /// modeled separately (see [`crate::governance::OverrideReason`]) since
    /// they bypass this table by design.
    #[must_use]
    pub fn can_transition_to(self, to: Self, gate: Option<&str>) -> bool {
        matches!(
            (self, to),
            (Self::Inbox, Self::Ready)
                | (Self::Ready, Self::Doing)
                | (Self::Doing, Self::Review)
        ) || (self == Self::Review && to == Self::Approval && gate.is_some())
            || (self == Self::Review && to == Self::Done && gate.is_none())
            || (self == Self::Approval && to == Self::Done)
    }
}

/// Tenancy scope of a `GovTask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GovScope {
    /// Shared across the whole tenant.
    Company,
    /// Isolated to a single `product_id`.
    Product,
}

/// A governed work item.
///
/// Invariant: `version` is incremented on every successful update; writes
/// use compare-and-swap on `version` (see `nanoclaw-storage::Store::
/// cas_update`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovTask {
    /// Unique identifier.
    pub id: GovTaskId,
    /// Short human-readable title.
    pub title: String,
    /// Full description of the work.
    pub description: String,
    /// Caller-defined category (e.g. `"bug"`, `"feature"`).
    pub task_type: String,
    /// Current state-machine position.
    pub state: GovState,
    /// Relative priority; lower sorts first.
    pub priority: i32,
    /// Product this task belongs to, when `scope == Product`.
    pub product_id: Option<ProductId>,
    /// Tenancy scope.
    pub scope: GovScope,
    /// Worker group this task is assigned to dispatch into.
    pub assigned_group: Option<String>,
    /// Named approval requirement blocking `Review -> Done`, if any.
    pub gate: Option<String>,
    /// Monotonic optimistic-concurrency counter.
    pub version: u64,
    /// Free-form metadata carried alongside the task.
    #[serde(default)]
    pub metadata: Value,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit entry recorded for every `GovTask` transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovActivity {
    /// The task this activity belongs to.
    pub task_id: GovTaskId,
    /// Short action label (`"transition"`, `"override"`, `"defer"`, ...).
    pub action: String,
    /// State transitioned from, if this activity represents a transition.
    pub from_state: Option<GovState>,
    /// State transitioned to, if this activity represents a transition.
    pub to_state: Option<GovState>,
    /// Who or what performed the action (`"system"`, a user id, ...).
    pub actor: String,
    /// Free-text justification.
    pub reason: Option<String>,
    /// When this activity was recorded.
    pub created_at: DateTime<Utc>,
}

/// A recorded approval against a named gate.
///
/// Unique on `(task_id, gate_type)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovApproval {
    /// The task this approval applies to.
    pub task_id: GovTaskId,
    /// Name of the gate satisfied (e.g. `"Security"`).
    pub gate_type: String,
    /// Who approved.
    pub approved_by: String,
    /// When the approval was recorded.
    pub approved_at: DateTime<Utc>,
    /// Optional free-text notes.
    pub notes: Option<String>,
}

/// Lifecycle of a single worker dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DispatchStatus {
    /// Claimed (the idempotency row exists) but not yet sent over HTTP.
    Enqueued,
    /// Accepted by the worker's `/worker/dispatch` endpoint.
    Sent,
    /// The worker reported successful completion.
    Completed,
    /// The worker reported failure, or the attempt otherwise failed.
    Failed,
}

/// Idempotency record for one dispatch attempt.
///
/// Unique on `dispatch_key`. A successful unique-insert of this row is the
/// claim that authorizes issuing the actual worker HTTP call; a constraint
/// violation means another tick already claimed this transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovDispatch {
    /// The task this dispatch is for.
    pub task_id: GovTaskId,
    /// State transitioned from.
    pub from_state: GovState,
    /// State transitioned to.
    pub to_state: GovState,
    /// Deterministic idempotency key, `"{task_id}:{from}->{to}:v{version}"`.
    pub dispatch_key: DispatchKey,
    /// Worker group this dispatch targets.
    pub group_target: String,
    /// Worker selected to receive the dispatch, once assigned.
    pub worker_id: Option<WorkerId>,
    /// Lifecycle status of the dispatch itself.
    pub status: DispatchStatus,
    /// When the claim row was created.
    pub created_at: DateTime<Utc>,
    /// When the worker accepted the dispatch.
    pub sent_at: Option<DateTime<Utc>>,
    /// When the worker reported completion or failure.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Metadata recorded when a founder override bypasses the normal gate
/// transition table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideReason {
    /// Who issued the override.
    pub overridden_by: String,
    /// Why the normal gate was bypassed.
    pub reason: String,
}

/// Context delivered to a worker group as part of a Context Pack before
/// dispatch: task metadata, product context, execution summary/evidence
/// activity, a trailing activity window, gate approvals, and
/// scope/product-filtered relevant memories (L3 withheld from non-main
/// groups).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextPack {
    /// The task being dispatched.
    pub task: GovTask,
    /// Product metadata, present only for `GovScope::Product` tasks.
    pub product_context: Option<Value>,
    /// Activities summarizing prior execution attempts, if any.
    pub execution_summary: Vec<GovActivity>,
    /// Activities recording evidence gathered during review.
    pub evidence: Vec<GovActivity>,
    /// Most recent activities, bounded to a trailing window.
    pub recent_activities: Vec<GovActivity>,
    /// Gate approvals recorded so far.
    pub approvals: Vec<GovApproval>,
    /// Memories relevant to this task, already filtered for the
    /// dispatching group's visibility.
    pub relevant_memories: Vec<crate::memory::Memory>,
}

//! Transition application: CAS-guarded state changes, activity logging,
//! and founder overrides (spec.md §4.G).

use chrono::Utc;
use nanoclaw_core::{GovActivity, GovState, GovTask, GovTaskId, OverrideReason};
use nanoclaw_storage::GovernanceRepository;

use crate::error::{GovernanceError, GovernanceResult};

/// Apply a permitted transition under compare-and-swap on `version`,
/// logging the activity entry. Fails with
/// [`GovernanceError::InvalidTransition`] if the transition table
/// rejects `from -> to` for this task's gate.
pub async fn apply<'a>(
    repo: &GovernanceRepository<'a>,
    task: &GovTask,
    to: GovState,
    actor: &str,
    reason: Option<String>,
) -> GovernanceResult<GovTask> {
    if !task.state.can_transition_to(to, task.gate.as_deref()) {
        return Err(GovernanceError::InvalidTransition {
            task_id: task.id.to_string(),
            from: task.state.as_wire_str().to_string(),
            to: to.as_wire_str().to_string(),
        });
    }

    let from = task.state;
    let updated = repo
        .cas_update(&task.id, task.version, |mut t| {
            t.state = to;
            t.updated_at = Utc::now();
            t
        })
        .await?;

    log_activity(repo, &task.id, "transition", Some(from), Some(to), actor, reason).await?;
    Ok(updated)
}

/// Apply a founder override: bypasses the permitted-transition table
/// entirely, writes override metadata into the task, and logs
/// `action=override`. Used for `REVIEW->DONE`/`APPROVAL->DONE` shortcuts.
pub async fn apply_override<'a>(
    repo: &GovernanceRepository<'a>,
    task: &GovTask,
    to: GovState,
    override_reason: OverrideReason,
) -> GovernanceResult<GovTask> {
    let from = task.state;
    let metadata_patch = serde_json::json!({ "override": override_reason });

    let updated = repo
        .cas_update(&task.id, task.version, |mut t| {
            t.state = to;
            t.updated_at = Utc::now();
            if let Some(obj) = t.metadata.as_object_mut() {
                obj.insert(
                    "override".to_string(),
                    metadata_patch["override"].clone(),
                );
            } else {
                t.metadata = metadata_patch.clone();
            }
            t
        })
        .await?;

    log_activity(
        repo,
        &task.id,
        "override",
        Some(from),
        Some(to),
        &updated
            .metadata
            .get("override")
            .and_then(|v| v.get("overridden_by"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string(),
        Some(
            updated
                .metadata
                .get("override")
                .and_then(|v| v.get("reason"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
        ),
    )
    .await?;
    Ok(updated)
}

/// Log a non-transition activity (`"defer"`, `"dispatch_claimed"`, ...)
/// against a task, with no state change attached.
pub async fn log_note<'a>(
    repo: &GovernanceRepository<'a>,
    task_id: &GovTaskId,
    action: &str,
    actor: &str,
    reason: Option<String>,
) -> GovernanceResult<()> {
    log_activity(repo, task_id, action, None, None, actor, reason).await
}

async fn log_activity<'a>(
    repo: &GovernanceRepository<'a>,
    task_id: &GovTaskId,
    action: &str,
    from: Option<GovState>,
    to: Option<GovState>,
    actor: &str,
    reason: Option<String>,
) -> GovernanceResult<()> {
    repo.append_activity(&GovActivity {
        task_id: task_id.clone(),
        action: action.to_string(),
        from_state: from,
        to_state: to,
        actor: actor.to_string(),
        reason,
        created_at: Utc::now(),
    })
    .await?;
    Ok(())
}

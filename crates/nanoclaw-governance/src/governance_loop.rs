//! The governance tick loop (spec.md §4.G): evaluates every non-terminal
//! `GovTask`, dispatches `READY` tasks idempotently, and auto-advances
//! gate-free `REVIEW`/satisfied `APPROVAL` tasks.

use std::sync::Arc;
use std::time::Duration;

use nanoclaw_core::{
    DispatchKey, DispatchStatus, GovDispatch, GovScope, GovState, GovTask, GroupFolder,
    NanoClawEvent, ProductStatus,
};
use nanoclaw_dispatch::WorkerDispatcher;
use nanoclaw_storage::store::Store;
use nanoclaw_storage::{GovernanceRepository, ProductRepository};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::GovernanceConfig;
use crate::context_pack;
use crate::error::{GovernanceError, GovernanceResult};
use crate::transitions;

/// Everything the governance loop needs per tick.
pub struct GovernanceDeps {
    /// Persistent store.
    pub store: Arc<Store>,
    /// Worker dispatcher used to hand `READY->DOING` work to the fleet.
    pub dispatcher: Arc<WorkerDispatcher>,
    /// Event bus, published to on every transition.
    pub events: nanoclaw_core::EventBus,
    /// The privileged group allowed to see L3 memories in context packs.
    pub main_group: GroupFolder,
    /// Tunables.
    pub config: GovernanceConfig,
}

/// Run the governance loop until `shutdown` fires, ticking every
/// `config.poll_interval`.
pub async fn run_governance_loop(deps: Arc<GovernanceDeps>, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(deps.config.poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => {
                info!("governance loop shutting down");
                return;
            }
            _ = ticker.tick() => {
                if let Err(err) = process_tick(&deps).await {
                    warn!(error = %err, "governance tick failed");
                }
            }
        }
    }
}

/// Evaluate every pending task once.
async fn process_tick(deps: &Arc<GovernanceDeps>) -> GovernanceResult<()> {
    let repo = GovernanceRepository::new(&deps.store);
    let tasks = repo.list_pending().await?;

    for task in tasks {
        let result = match task.state {
            GovState::Ready => try_dispatch(deps, &repo, &task).await,
            GovState::Review => try_auto_review(&repo, &task).await,
            GovState::Approval => try_auto_approval(&repo, &task).await,
            _ => Ok(()),
        };
        if let Err(err) = result {
            warn!(task_id = %task.id, error = %err, "governance tick step failed");
        }
    }
    Ok(())
}

/// `REVIEW -> DONE` (gate-free) or `REVIEW -> APPROVAL` (gated).
async fn try_auto_review<'a>(
    repo: &GovernanceRepository<'a>,
    task: &GovTask,
) -> GovernanceResult<()> {
    let to = if task.gate.is_some() {
        GovState::Approval
    } else {
        GovState::Done
    };
    transitions::apply(repo, task, to, "system", None).await?;
    Ok(())
}

/// `APPROVAL -> DONE`, once a matching gate approval has been recorded.
async fn try_auto_approval<'a>(
    repo: &GovernanceRepository<'a>,
    task: &GovTask,
) -> GovernanceResult<()> {
    let Some(gate) = task.gate.as_deref() else {
        return Ok(());
    };
    let approved = repo.get_approval(&task.id, gate).await?.is_some();
    if !approved {
        return Ok(());
    }
    transitions::apply(repo, task, GovState::Done, "system", None).await?;
    Ok(())
}

/// `READY -> DOING`: product gating, WIP bound, idempotent dispatch
/// claim, Context Pack assembly, and the actual worker HTTP dispatch.
async fn try_dispatch<'a>(
    deps: &Arc<GovernanceDeps>,
    repo: &GovernanceRepository<'a>,
    task: &GovTask,
) -> GovernanceResult<()> {
    let Some(group) = task.assigned_group.clone() else {
        return Err(GovernanceError::NoAssignedGroup {
            task_id: task.id.to_string(),
        });
    };

    if task.scope == GovScope::Product {
        if let Some(product_id) = &task.product_id {
            let products = ProductRepository::new(&deps.store);
            let gated = products
                .get(product_id)
                .await?
                .is_none_or(|p| p.status != ProductStatus::Active);
            if gated {
                transitions::log_note(
                    repo,
                    &task.id,
                    "defer",
                    "system",
                    Some(format!("product {product_id} is not active")),
                )
                .await?;
                return Ok(());
            }
        }
    }

    let current_wip = repo.count_doing_for_group(&group).await?;
    if current_wip >= deps.config.wip_limit(&group) {
        transitions::log_note(
            repo,
            &task.id,
            "defer",
            "system",
            Some(format!("group {group} at WIP limit")),
        )
        .await?;
        return Ok(());
    }

    let dispatch_key = DispatchKey::build(&task.id, "READY", "DOING", task.version);
    let claim = GovDispatch {
        task_id: task.id.clone(),
        from_state: GovState::Ready,
        to_state: GovState::Doing,
        dispatch_key: dispatch_key.clone(),
        group_target: group.clone(),
        worker_id: None,
        status: DispatchStatus::Enqueued,
        created_at: chrono::Utc::now(),
        sent_at: None,
        completed_at: None,
    };

    match repo.claim_dispatch(&claim).await {
        Ok(()) => {}
        Err(nanoclaw_storage::StorageError::AlreadyClaimed(_)) => {
            // Another tick (or a concurrent process) already holds this
            // transition's claim; this tick's work is done.
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    }

    let group_folder = GroupFolder::new(group.clone());
    let pack = context_pack::build(&deps.store, &deps.main_group, task, &group_folder).await?;
    let pack_value = serde_json::to_value(&pack).unwrap_or(serde_json::Value::Null);

    let dispatch_result = deps
        .dispatcher
        .dispatch(&task.id, &group, &group_folder, &dispatch_key.0, pack_value)
        .await;

    let mut updated_claim = claim;
    match dispatch_result {
        Ok(worker_id) => {
            updated_claim.status = DispatchStatus::Sent;
            updated_claim.worker_id = Some(worker_id);
            updated_claim.sent_at = Some(chrono::Utc::now());
            repo.update_dispatch(&updated_claim).await?;

            transitions::apply(repo, task, GovState::Doing, "system", None).await?;
            deps.events.publish(NanoClawEvent::GovTransition {
                task_id: task.id.clone(),
                from: "READY".to_string(),
                to: "DOING".to_string(),
                at: chrono::Utc::now(),
            });
            Ok(())
        }
        Err(err) => {
            updated_claim.status = DispatchStatus::Failed;
            updated_claim.completed_at = Some(chrono::Utc::now());
            repo.update_dispatch(&updated_claim).await?;
            transitions::log_note(
                repo,
                &task.id,
                "dispatch_failed",
                "system",
                Some(err.to_string()),
            )
            .await?;
            Err(err.into())
        }
    }
}

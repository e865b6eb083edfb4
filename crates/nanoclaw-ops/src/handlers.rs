//! Route handlers for the read-only introspection surface and the
//! governance write action (spec.md §6).

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use nanoclaw_core::{GovState, GovTaskId, OverrideReason, ProductId, WorkerId};
use nanoclaw_governance::{approvals, triage};
use nanoclaw_limits::{LimitContext, LimitsEngine};
use nanoclaw_storage::{
    GovernanceRepository, LimitsRepository, MemoryRepository, ProductRepository, WorkerRepository,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{OpsError, OpsResult};
use crate::state::AppState;

fn parse_gov_state(raw: &str) -> Option<GovState> {
    match raw.to_ascii_uppercase().as_str() {
        "INBOX" => Some(GovState::Inbox),
        "READY" => Some(GovState::Ready),
        "DOING" => Some(GovState::Doing),
        "REVIEW" => Some(GovState::Review),
        "APPROVAL" => Some(GovState::Approval),
        "DONE" => Some(GovState::Done),
        _ => None,
    }
}

/// `GET /ops/health`.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /ops/stats`.
pub async fn stats(State(state): State<AppState>) -> OpsResult<Json<Value>> {
    let gov_repo = GovernanceRepository::new(&state.store);
    let pending = gov_repo.list_pending().await?;
    let mut by_state: HashMap<&str, usize> = HashMap::new();
    for task in &pending {
        *by_state.entry(task.state.as_wire_str()).or_insert(0) += 1;
    }

    let limits_repo = LimitsRepository::new(&state.store);
    let denials_24h = limits_repo.denials_since(Utc::now() - chrono::Duration::hours(24)).await?;

    let workers = WorkerRepository::new(&state.store).list().await?;
    let online = workers
        .iter()
        .filter(|w| w.status == nanoclaw_core::WorkerStatus::Online)
        .count();
    let offline = workers.len() - online;

    Ok(Json(json!({
        "tasks_pending_by_state": by_state,
        "limits": { "denials_24h": denials_24h },
        "workers": { "online": online, "offline": offline, "total": workers.len() },
        "events": { "subscribers": state.events.subscriber_count() },
    })))
}

/// Query parameters accepted by `GET /ops/tasks`.
#[derive(Debug, Deserialize)]
pub struct TaskListParams {
    state: Option<String>,
    #[serde(rename = "type")]
    task_type: Option<String>,
    product_id: Option<String>,
}

/// `GET /ops/tasks[?state|type|product_id]`.
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<TaskListParams>,
) -> OpsResult<Json<Value>> {
    let repo = GovernanceRepository::new(&state.store);
    let gov_state = params.state.as_deref().and_then(parse_gov_state);
    let product_id = params.product_id.as_deref().map(ProductId::new);
    let tasks = repo
        .list_filtered(gov_state, params.task_type.as_deref(), product_id.as_ref())
        .await?;
    Ok(Json(json!(tasks)))
}

/// `GET /ops/tasks/:id`.
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> OpsResult<Json<Value>> {
    let repo = GovernanceRepository::new(&state.store);
    let task = repo
        .get(&GovTaskId::new(task_id.clone()))
        .await?
        .ok_or(OpsError::NotFound(task_id))?;
    Ok(Json(json!(task)))
}

/// `GET /ops/tasks/:id/activities`.
pub async fn task_activities(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> OpsResult<Json<Value>> {
    let repo = GovernanceRepository::new(&state.store);
    let activities = repo.activities_for(&GovTaskId::new(task_id)).await?;
    Ok(Json(json!(activities)))
}

/// `GET /ops/tasks/:id/approvals`.
pub async fn task_approvals(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> OpsResult<Json<Value>> {
    let repo = GovernanceRepository::new(&state.store);
    let approvals = repo.approvals_for(&GovTaskId::new(task_id)).await?;
    Ok(Json(json!(approvals)))
}

/// `GET /ops/products`.
pub async fn list_products(State(state): State<AppState>) -> OpsResult<Json<Value>> {
    let repo = ProductRepository::new(&state.store);
    Ok(Json(json!(repo.list().await?)))
}

/// `GET /ops/products/:id`.
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> OpsResult<Json<Value>> {
    let repo = ProductRepository::new(&state.store);
    let product = repo
        .get(&ProductId::new(product_id.clone()))
        .await?
        .ok_or(OpsError::NotFound(product_id))?;
    Ok(Json(json!(product)))
}

/// `GET /ops/workers`.
pub async fn list_workers(State(state): State<AppState>) -> OpsResult<Json<Value>> {
    let repo = WorkerRepository::new(&state.store);
    Ok(Json(json!(repo.list().await?)))
}

/// `GET /ops/workers/:id`.
pub async fn get_worker(
    State(state): State<AppState>,
    Path(worker_id): Path<String>,
) -> OpsResult<Json<Value>> {
    let repo = WorkerRepository::new(&state.store);
    let worker = repo
        .get(&WorkerId::new(worker_id.clone()))
        .await?
        .ok_or(OpsError::NotFound(worker_id))?;
    Ok(Json(json!(worker)))
}

/// `GET /ops/workers/:id/dispatches`.
pub async fn worker_dispatches(
    State(state): State<AppState>,
    Path(worker_id): Path<String>,
) -> OpsResult<Json<Value>> {
    let repo = GovernanceRepository::new(&state.store);
    let dispatches = repo.list_dispatches_for_worker(&WorkerId::new(worker_id)).await?;
    Ok(Json(json!(dispatches)))
}

/// `GET /ops/workers/:id/tunnels`. The host never manages the `ssh -NL`
/// process itself (spec.md §4.E); this surfaces the connection
/// parameters an operator would plug into one.
pub async fn worker_tunnel(
    State(state): State<AppState>,
    Path(worker_id): Path<String>,
) -> OpsResult<Json<Value>> {
    let repo = WorkerRepository::new(&state.store);
    let worker = repo
        .get(&WorkerId::new(worker_id.clone()))
        .await?
        .ok_or(OpsError::NotFound(worker_id))?;
    Ok(Json(json!({
        "host": worker.host,
        "user": worker.user,
        "ssh_port": worker.ssh_port,
        "local_port": worker.local_port,
        "remote_port": worker.remote_port,
        "status": worker.status,
    })))
}

/// One outstanding gate, surfaced by `GET /ops/approvals`.
#[derive(Debug, Serialize)]
struct PendingApproval {
    task_id: GovTaskId,
    gate: String,
    recorded: Vec<nanoclaw_core::GovApproval>,
}

/// `GET /ops/approvals`: every task currently blocked in `APPROVAL`,
/// alongside whatever approvals have already been recorded against its
/// gate.
pub async fn pending_approvals(State(state): State<AppState>) -> OpsResult<Json<Value>> {
    let repo = GovernanceRepository::new(&state.store);
    let blocked = repo.list_filtered(Some(GovState::Approval), None, None).await?;

    let mut out = Vec::with_capacity(blocked.len());
    for task in blocked {
        let Some(gate) = task.gate.clone() else {
            continue;
        };
        let recorded = repo.approvals_for(&task.id).await?;
        out.push(PendingApproval {
            task_id: task.id,
            gate,
            recorded,
        });
    }
    Ok(Json(json!(out)))
}

/// Query parameters shared by `/ops/memories` and `/ops/memories/search`.
#[derive(Debug, Deserialize)]
pub struct MemoryQueryParams {
    q: String,
    product_id: Option<String>,
    #[serde(default = "default_memory_limit")]
    limit: usize,
}

fn default_memory_limit() -> usize {
    20
}

/// `GET /ops/memories?q=`: broker-filtered recall as the privileged main
/// group would see it (L3 visible, product-scoped to `product_id` when
/// given).
pub async fn recall_memories(
    State(state): State<AppState>,
    Query(params): Query<MemoryQueryParams>,
) -> OpsResult<Json<Value>> {
    let repo = MemoryRepository::new(&state.store);
    let broker = nanoclaw_memory::MemoryBroker::new(repo, state.main_group.clone());
    let product_id = params.product_id.as_deref().map(ProductId::new);
    let memories = broker
        .recall(&state.main_group, &params.q, product_id.as_ref(), params.limit, Utc::now())
        .await?;
    Ok(Json(json!(memories)))
}

/// `GET /ops/memories/search?q=`: the raw, unfiltered candidate set, for
/// operator debugging of recall visibility decisions.
pub async fn search_memories(
    State(state): State<AppState>,
    Query(params): Query<MemoryQueryParams>,
) -> OpsResult<Json<Value>> {
    let repo = MemoryRepository::new(&state.store);
    let memories = repo.search(&params.q, params.limit).await?;
    Ok(Json(json!(memories)))
}

/// Tagged governance write actions accepted by `POST /ops/actions/transition`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TransitionAction {
    /// `INBOX -> READY`, assigning a worker group.
    Triage {
        /// The task to triage.
        task_id: String,
        /// The worker group to assign it to.
        group: String,
        /// Who triaged it.
        actor: String,
    },
    /// Record a gate approval, transitioning `APPROVAL -> DONE` if this
    /// was the blocking gate.
    Approve {
        /// The task awaiting approval.
        task_id: String,
        /// The gate being satisfied.
        gate_type: String,
        /// Who approved.
        approved_by: String,
        /// Optional free-text notes.
        #[serde(default)]
        notes: Option<String>,
    },
    /// A founder override, bypassing the permitted-transition table.
    Override {
        /// The task to override.
        task_id: String,
        /// The state to force it into.
        to: String,
        /// Who issued the override.
        overridden_by: String,
        /// Why the normal gate was bypassed.
        reason: String,
    },
}

/// `POST /ops/actions/transition`: the generic governance write surface,
/// rate-limited under the `cockpit_write` operation.
pub async fn actions_transition(
    State(state): State<AppState>,
    Json(action): Json<TransitionAction>,
) -> OpsResult<Json<Value>> {
    let limits_repo = LimitsRepository::new(&state.store);
    let engine = LimitsEngine::new(limits_repo, &state.limits_config);
    let decision = engine
        .enforce(
            "cockpit_write",
            &LimitContext {
                scope_key: "global".to_string(),
                provider: None,
            },
            Utc::now(),
        )
        .await?;
    if !decision.allowed {
        return Err(OpsError::RateLimited(
            decision.detail.unwrap_or_else(|| "cockpit_write denied".to_string()),
        ));
    }

    let gov_repo = GovernanceRepository::new(&state.store);
    let task = match action {
        TransitionAction::Triage { task_id, group, actor } => {
            triage::triage(&gov_repo, &GovTaskId::new(task_id), group, &actor).await?
        }
        TransitionAction::Approve {
            task_id,
            gate_type,
            approved_by,
            notes,
        } => {
            approvals::approve(&gov_repo, &GovTaskId::new(task_id), &gate_type, &approved_by, notes)
                .await?
        }
        TransitionAction::Override {
            task_id,
            to,
            overridden_by,
            reason,
        } => {
            let task_id = GovTaskId::new(task_id);
            let current = gov_repo
                .get(&task_id)
                .await?
                .ok_or_else(|| OpsError::NotFound(task_id.to_string()))?;
            let to_state = parse_gov_state(&to)
                .ok_or_else(|| OpsError::BadRequest(format!("unknown state {to}")))?;
            nanoclaw_governance::transitions::apply_override(
                &gov_repo,
                &current,
                to_state,
                OverrideReason { overridden_by, reason },
            )
            .await?
        }
    };
    Ok(Json(json!(task)))
}

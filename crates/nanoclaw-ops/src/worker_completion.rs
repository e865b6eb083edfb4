//! `POST /ops/worker/completion/:worker_id` (spec.md §4.D, §6):
//! the inbound, HMAC-verified callback a worker fires when it finishes
//! (or fails) a dispatched task. The worker id travels in the path so
//! the verifier can look up the one worker's shared secret the HMAC
//! must be checked against before the body is trusted at all.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use nanoclaw_auth::{InboundHeaders, Verifier, VerifierConfig};
use nanoclaw_core::{CompletionCallback, WorkerId};
use nanoclaw_governance::callback;
use nanoclaw_storage::{GovernanceRepository, LimitsRepository, WorkerRepository};

use crate::error::{OpsError, OpsResult};
use crate::state::AppState;

fn inbound_headers(headers: &HeaderMap) -> InboundHeaders {
    let get = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    InboundHeaders {
        hmac: get("x-worker-hmac"),
        timestamp: get("x-worker-timestamp"),
        request_id: get("x-worker-requestid"),
    }
}

/// Verify the inbound HMAC against `worker_id`'s shared secret, then
/// apply the completion to move the task `DOING -> REVIEW` and release
/// the worker's claimed WIP slot.
pub async fn worker_completion(
    State(state): State<AppState>,
    Path(worker_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> OpsResult<Json<nanoclaw_core::GovTask>> {
    let worker_id = WorkerId::new(worker_id);
    let workers = WorkerRepository::new(&state.store);
    let worker = workers
        .get(&worker_id)
        .await?
        .ok_or_else(|| OpsError::NotFound(worker_id.to_string()))?;

    let limits_repo = LimitsRepository::new(&state.store);
    let verifier = Verifier::new(
        limits_repo,
        VerifierConfig {
            ttl_ms: state.worker_hmac_ttl_ms,
        },
    );
    verifier
        .verify(
            &inbound_headers(&headers),
            worker.shared_secret.as_bytes(),
            &body,
            chrono::Utc::now().timestamp_millis(),
        )
        .await?;

    let callback: CompletionCallback = serde_json::from_slice(&body)
        .map_err(|e| OpsError::BadRequest(format!("malformed completion body: {e}")))?;

    let gov_repo = GovernanceRepository::new(&state.store);
    let task = callback::apply_completion(&gov_repo, &state.dispatcher, &worker_id, &callback).await?;
    Ok(Json(task))
}

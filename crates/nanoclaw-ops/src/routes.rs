//! Router assembly: a secret-gated introspection surface plus the
//! worker-facing completion callback, which carries its own HMAC auth
//! instead of `X-OS-SECRET` (spec.md §6).

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{require_os_secret, require_write_secret};
use crate::sse::events_stream;
use crate::state::AppState;
use crate::worker_completion::worker_completion;

/// Build the full ops router: introspection behind `X-OS-SECRET`,
/// `/ops/actions/transition` additionally behind `X-WRITE-SECRET`, and
/// `/ops/worker/completion/:worker_id` behind its own per-worker HMAC.
pub fn router(state: AppState) -> Router {
    let write_protected = Router::new()
        .route("/ops/actions/transition", post(handlers::actions_transition))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_write_secret));

    let read_only = Router::new()
        .route("/ops/health", get(handlers::health))
        .route("/ops/stats", get(handlers::stats))
        .route("/ops/tasks", get(handlers::list_tasks))
        .route("/ops/tasks/:id", get(handlers::get_task))
        .route("/ops/tasks/:id/activities", get(handlers::task_activities))
        .route("/ops/tasks/:id/approvals", get(handlers::task_approvals))
        .route("/ops/products", get(handlers::list_products))
        .route("/ops/products/:id", get(handlers::get_product))
        .route("/ops/workers", get(handlers::list_workers))
        .route("/ops/workers/:id", get(handlers::get_worker))
        .route("/ops/workers/:id/dispatches", get(handlers::worker_dispatches))
        .route("/ops/workers/:id/tunnels", get(handlers::worker_tunnel))
        .route("/ops/approvals", get(handlers::pending_approvals))
        .route("/ops/memories", get(handlers::recall_memories))
        .route("/ops/memories/search", get(handlers::search_memories))
        .route("/ops/events", get(events_stream));

    let protected = read_only
        .merge(write_protected)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_os_secret));

    let worker_facing =
        Router::new().route("/ops/worker/completion/:worker_id", post(worker_completion));

    Router::new()
        .merge(protected)
        .merge(worker_facing)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

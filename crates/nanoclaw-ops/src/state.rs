//! Shared application state handed to every route handler.

use std::sync::Arc;

use nanoclaw_core::{EventBus, GroupFolder};
use nanoclaw_dispatch::WorkerDispatcher;
use nanoclaw_limits::LimitsConfig;
use nanoclaw_storage::store::Store;

use crate::config::OpsConfig;

/// Everything a route handler needs: the store, the dispatcher (for
/// releasing WIP on worker completion callbacks), the event bus (for the
/// SSE endpoint), the privileged group for memory visibility, the
/// write-action rate limit configuration, and the ops-specific secrets.
#[derive(Clone)]
pub struct AppState {
    /// Persistent store.
    pub store: Arc<Store>,
    /// Worker dispatcher, used by the completion callback to release WIP.
    pub dispatcher: Arc<WorkerDispatcher>,
    /// Event bus, subscribed to by `/ops/events`.
    pub events: EventBus,
    /// The privileged group allowed to see L3 memories.
    pub main_group: GroupFolder,
    /// Limits configuration used to rate-limit write actions
    /// (`cockpit_write`).
    pub limits_config: Arc<LimitsConfig>,
    /// Secrets and bind address this API was configured with.
    pub ops_config: Arc<OpsConfig>,
    /// Clock tolerance applied to the inbound worker HMAC on
    /// `/ops/worker/completion`.
    pub worker_hmac_ttl_ms: i64,
}

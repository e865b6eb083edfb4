//! Worker selection, capacity claim, and signed dispatch (spec.md §4.E).

use chrono::Utc;
use nanoclaw_core::{DispatchPayload, GovTaskId, GroupFolder};
use nanoclaw_storage::store::Store;
use nanoclaw_storage::workers::WorkerRepository;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::WorkerHttpClient;
use crate::error::{DispatchError, DispatchResult};
use crate::selector::WorkerSelector;

/// Everything needed to pick a worker, claim its capacity, and post a
/// dispatch over its tunnel.
pub struct WorkerDispatcher {
    store: std::sync::Arc<Store>,
    client: WorkerHttpClient,
    selector: WorkerSelector,
}

impl WorkerDispatcher {
    /// Build a dispatcher over a shared store and HTTP client.
    #[must_use]
    pub fn new(store: std::sync::Arc<Store>, client: WorkerHttpClient) -> Self {
        Self {
            store,
            client,
            selector: WorkerSelector::new(),
        }
    }

    /// Select an eligible worker for `group`, claim one unit of its WIP
    /// capacity, and post the dispatch over its tunnel.
    ///
    /// Capacity is claimed *before* the HTTP call so a concurrent
    /// dispatch attempt cannot both observe spare capacity and both post
    /// to the same worker; if the HTTP call itself fails the claim is
    /// released again.
    pub async fn dispatch(
        &self,
        task_id: &GovTaskId,
        group: &str,
        group_folder: &GroupFolder,
        dispatch_key: &str,
        context_pack: Value,
    ) -> DispatchResult<nanoclaw_core::WorkerId> {
        let repo = WorkerRepository::new(&self.store);
        let fleet = repo.list().await?;

        let candidate = self
            .selector
            .select(group, &fleet)
            .ok_or_else(|| DispatchError::NoCapacity {
                group: group.to_string(),
            })?
            .id
            .clone();

        let Some(claimed) = repo.claim_capacity(&candidate, group).await? else {
            return Err(DispatchError::NoCapacity {
                group: group.to_string(),
            });
        };

        let payload = DispatchPayload {
            task_id: task_id.clone(),
            group_folder: group_folder.clone(),
            dispatch_key: dispatch_key.to_string(),
            context_pack,
        };

        let request_id = Uuid::new_v4().to_string();
        let timestamp_ms = Utc::now().timestamp_millis();

        let result = self
            .client
            .dispatch(&claimed, &request_id, timestamp_ms, &payload)
            .await;

        match result {
            Ok(()) => {
                info!(worker_id = %claimed.id, %dispatch_key, "dispatched task to worker");
                Ok(claimed.id)
            }
            Err(err) => {
                warn!(worker_id = %claimed.id, error = %err, "dispatch attempt failed, releasing capacity");
                repo.release_capacity(&claimed.id).await?;
                Err(err)
            }
        }
    }

    /// Release one unit of WIP capacity on a worker's completion
    /// callback (success or failure alike).
    pub async fn release(&self, worker_id: &nanoclaw_core::WorkerId) -> DispatchResult<()> {
        let repo = WorkerRepository::new(&self.store);
        repo.release_capacity(worker_id).await?;
        Ok(())
    }
}

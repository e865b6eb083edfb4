//! Tunnel health loop (spec.md §4.E): polls each worker's `/worker/health`
//! endpoint on a fixed interval and applies the 3-strikes-offline policy.

use std::sync::Arc;
use std::time::Duration;

use nanoclaw_core::{EventBus, NanoClawEvent};
use nanoclaw_storage::store::Store;
use nanoclaw_storage::workers::WorkerRepository;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::client::WorkerHttpClient;
use crate::config::DispatchConfig;

/// Everything the health loop needs per tick.
pub struct HealthDeps {
    /// Persistent store.
    pub store: Arc<Store>,
    /// HTTP client used to reach each worker over its tunnel.
    pub client: WorkerHttpClient,
    /// Event bus, published to on every status transition.
    pub events: EventBus,
    /// Tunables.
    pub config: DispatchConfig,
}

/// Run the health loop until `shutdown` fires, ticking every
/// `config.health_interval`.
pub async fn run_health_loop(deps: Arc<HealthDeps>, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(deps.config.health_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => {
                info!("worker health loop shutting down");
                return;
            }
            _ = ticker.tick() => {
                if let Err(err) = check_all(&deps).await {
                    warn!(error = %err, "worker health tick failed");
                }
            }
        }
    }
}

async fn check_all(deps: &Arc<HealthDeps>) -> nanoclaw_storage::StorageResult<()> {
    let repo = WorkerRepository::new(&deps.store);
    let fleet = repo.list().await?;

    for worker in fleet {
        let healthy = deps.client.health(&worker).await.is_ok();
        let Some((updated, transitioned)) = repo
            .record_health(&worker.id, healthy, deps.config.health_failure_threshold)
            .await?
        else {
            continue;
        };

        if transitioned {
            warn!(worker_id = %updated.id, status = ?updated.status, "worker tunnel status changed");
            deps.events.publish(NanoClawEvent::WorkerStatusChanged {
                worker_id: updated.id.clone(),
                status: match updated.status {
                    nanoclaw_core::WorkerStatus::Online => "online".to_string(),
                    nanoclaw_core::WorkerStatus::Offline => "offline".to_string(),
                },
                at: chrono::Utc::now(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanoclaw_core::{Worker, WorkerId, WorkerStatus};
    use nanoclaw_storage::db::Database;
    use nanoclaw_storage::kv::MemoryKvStore;

    async fn store() -> Arc<Store> {
        let db = Database::connect_memory().await.unwrap();
        Arc::new(Store::new(db, Arc::new(MemoryKvStore::new())))
    }

    fn worker(id: &str) -> Worker {
        Worker {
            id: WorkerId::new(id),
            host: "10.0.0.1".to_string(),
            user: "nanoclaw".to_string(),
            ssh_port: 22,
            local_port: 9999,
            remote_port: 8080,
            status: WorkerStatus::Online,
            max_wip: 1,
            current_wip: 0,
            shared_secret: "secret".to_string(),
            groups_served: vec!["developer".to_string()],
            consecutive_failures: 0,
        }
    }

    #[tokio::test]
    async fn test_unreachable_worker_flips_offline_after_threshold() {
        let store = store().await;
        let repo = WorkerRepository::new(&store);
        repo.upsert(&worker("w1")).await.unwrap();

        let deps = Arc::new(HealthDeps {
            store: store.clone(),
            client: WorkerHttpClient::new(Duration::from_millis(50)),
            events: EventBus::new(),
            config: DispatchConfig {
                health_failure_threshold: 2,
                ..Default::default()
            },
        });

        check_all(&deps).await.unwrap();
        let mid = repo.get(&WorkerId::new("w1")).await.unwrap().unwrap();
        assert_eq!(mid.status, WorkerStatus::Online);

        check_all(&deps).await.unwrap();
        let after = repo.get(&WorkerId::new("w1")).await.unwrap().unwrap();
        assert_eq!(after.status, WorkerStatus::Offline);
    }
}

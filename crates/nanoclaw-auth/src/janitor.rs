//! Periodic nonce table cleanup (spec.md §4.D step 6).

use std::time::Duration;

use nanoclaw_storage::{LimitsRepository, Store};
use tracing::{debug, warn};

/// Tunables for the nonce janitor loop.
#[derive(Debug, Clone, Copy)]
pub struct JanitorConfig {
    /// How often the janitor runs.
    pub interval: Duration,
    /// Nonces older than this are deleted outright, mirroring `NONCE_TTL_MS`.
    pub retention: chrono::Duration,
    /// Hard cap on total nonce rows, mirroring `NONCE_CAP`.
    pub cap: u64,
}

/// Run one cleanup pass: delete nonces older than `retention`, then cap
/// the table to `cap` rows if it is still over budget.
pub async fn sweep_once(store: &Store, config: &JanitorConfig) -> nanoclaw_storage::StorageResult<()> {
    let repo = LimitsRepository::new(store);
    let cutoff = chrono::Utc::now() - config.retention;

    let expired = repo.purge_nonces_before(cutoff).await?;
    if expired > 0 {
        debug!(count = expired, "purged expired nonces");
    }

    let capped = repo.enforce_nonce_cap(config.cap).await?;
    if capped > 0 {
        warn!(count = capped, cap = config.cap, "nonce table over cap, trimmed oldest rows");
    }

    Ok(())
}

/// Run the janitor forever on `config.interval`, logging but not
/// propagating storage errors so one failed sweep never kills the loop.
pub async fn run(store: Store, config: JanitorConfig) {
    let mut ticker = tokio::time::interval(config.interval);
    loop {
        ticker.tick().await;
        if let Err(error) = sweep_once(&store, &config).await {
            warn!(%error, "nonce janitor sweep failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanoclaw_core::Nonce;
    use nanoclaw_storage::{Database, MemoryKvStore};
    use std::sync::Arc;

    async fn store() -> Store {
        let db = Database::connect_memory().await.unwrap();
        Store::new(db, Arc::new(MemoryKvStore::new()))
    }

    #[tokio::test]
    async fn test_sweep_purges_expired_nonces() {
        let store = store().await;
        let repo = LimitsRepository::new(&store);
        let old = chrono::Utc::now() - chrono::Duration::hours(2);
        repo.claim_nonce(&Nonce {
            request_id: "req-old".to_string(),
            received_at: old,
        })
        .await
        .unwrap();

        sweep_once(
            &store,
            &JanitorConfig {
                interval: Duration::from_secs(60),
                retention: chrono::Duration::minutes(1),
                cap: 1_000,
            },
        )
        .await
        .unwrap();

        let fresh_claim = repo
            .claim_nonce(&Nonce {
                request_id: "req-old".to_string(),
                received_at: chrono::Utc::now(),
            })
            .await;
        assert!(fresh_claim.is_ok());
    }
}

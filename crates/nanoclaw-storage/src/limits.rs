//! Limits Engine and Worker Auth repository: rate counters, daily quotas,
//! circuit breakers, replay-protection nonces, and the denial log.

use chrono::{DateTime, Utc};
use nanoclaw_core::{Breaker, LimitDenial, Nonce, QuotaDaily, RateCounter};

use crate::error::{StorageError, StorageResult};
use crate::store::Store;

const RATE_COUNTER_TABLE: &str = "rate_counter";
const QUOTA_TABLE: &str = "quota_daily";
const BREAKER_TABLE: &str = "breaker";
const NONCE_TABLE: &str = "nonce";
const DENIAL_NAMESPACE: &str = "limit_denial";

/// Typed access to rate/quota/breaker/nonce state.
pub struct LimitsRepository<'a> {
    store: &'a Store,
}

impl<'a> LimitsRepository<'a> {
    /// Build a repository over `store`.
    #[must_use]
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Atomically increment the counter for `(op, scope_key, window_key)`
    /// and return the new count.
    pub async fn increment_rate_counter(
        &self,
        op: &str,
        scope_key: &str,
        window_key: &str,
    ) -> StorageResult<u64> {
        let row_id = format!("{op}:{scope_key}:{window_key}");
        let current: Option<RateCounter> = self.store.get(RATE_COUNTER_TABLE, &row_id).await?;
        let count = current.map_or(0, |c| c.count) + 1;
        let counter = RateCounter {
            op: op.to_string(),
            scope_key: scope_key.to_string(),
            window_key: window_key.to_string(),
            count,
        };
        self.store.upsert(RATE_COUNTER_TABLE, &row_id, &counter).await?;
        Ok(count)
    }

    /// Purge rate-counter windows older than `cutoff` (an ISO minute key
    /// lexicographically before the live window).
    pub async fn purge_rate_counters_before(&self, cutoff_window_key: &str) -> StorageResult<()> {
        self.store
            .db()
            .client()
            .query("DELETE FROM rate_counter WHERE window_key < $cutoff")
            .bind(("cutoff", cutoff_window_key.to_string()))
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    /// Atomically increment today's usage for `(op, scope_key)` and
    /// return the resulting row.
    pub async fn increment_quota(
        &self,
        op: &str,
        scope_key: &str,
        day_key: &str,
        soft_limit: u64,
        hard_limit: u64,
    ) -> StorageResult<QuotaDaily> {
        let row_id = format!("{op}:{scope_key}:{day_key}");
        let current: Option<QuotaDaily> = self.store.get(QUOTA_TABLE, &row_id).await?;
        let used = current.map_or(0, |c| c.used) + 1;
        let quota = QuotaDaily {
            op: op.to_string(),
            scope_key: scope_key.to_string(),
            day_key: day_key.to_string(),
            used,
            soft_limit,
            hard_limit,
        };
        self.store.upsert(QUOTA_TABLE, &row_id, &quota).await?;
        Ok(quota)
    }

    /// Load the breaker row for a provider, if it has ever tripped.
    pub async fn get_breaker(&self, provider: &str) -> StorageResult<Option<Breaker>> {
        self.store.get(BREAKER_TABLE, provider).await
    }

    /// Overwrite the breaker row for a provider. Breaker transitions are
    /// serialized by the single embedded-database connection, which is
    /// sufficient for the "no two concurrent transitions on the same
    /// row" ordering guarantee the model requires.
    pub async fn put_breaker(&self, breaker: &Breaker) -> StorageResult<()> {
        self.store.upsert(BREAKER_TABLE, &breaker.provider, breaker).await
    }

    /// Attempt to claim a nonce as unseen. Fails with
    /// [`StorageError::AlreadyClaimed`] if `request_id` has already been
    /// recorded (replay).
    pub async fn claim_nonce(&self, nonce: &Nonce) -> StorageResult<()> {
        self.store
            .claim_unique(NONCE_TABLE, &nonce.request_id, nonce)
            .await
    }

    /// Delete nonces received before `cutoff`, bounding table growth.
    pub async fn purge_nonces_before(&self, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        let mut response = self
            .store
            .db()
            .client()
            .query("DELETE FROM nonce WHERE received_at < $cutoff RETURN BEFORE")
            .bind(("cutoff", cutoff))
            .await
            .map_err(StorageError::from)?;
        let deleted: Vec<Nonce> = response.take(0).map_err(StorageError::from)?;
        Ok(deleted.len() as u64)
    }

    /// Cap the nonce table to at most `cap` rows, deleting the oldest
    /// first when over budget.
    pub async fn enforce_nonce_cap(&self, cap: u64) -> StorageResult<u64> {
        let mut response = self
            .store
            .db()
            .client()
            .query(
                "DELETE FROM nonce WHERE request_id IN (
                     SELECT VALUE request_id FROM (
                         SELECT request_id FROM nonce ORDER BY received_at DESC LIMIT 1000000 START $cap
                     )
                 ) RETURN BEFORE",
            )
            .bind(("cap", cap))
            .await
            .map_err(StorageError::from)?;
        let deleted: Vec<Nonce> = response.take(0).map_err(StorageError::from)?;
        Ok(deleted.len() as u64)
    }

    /// Append a denial log entry.
    pub async fn log_denial(&self, denial: &LimitDenial) -> StorageResult<()> {
        let entry_id = format!(
            "{}:{}",
            denial.created_at.timestamp_nanos_opt().unwrap_or(0),
            denial.op
        );
        self.store.append(DENIAL_NAMESPACE, &entry_id, denial).await
    }

    /// Count denials logged since `since` (used for `/ops/stats`).
    pub async fn denials_since(&self, since: DateTime<Utc>) -> StorageResult<u64> {
        let entries: Vec<LimitDenial> = self.store.list_appended(DENIAL_NAMESPACE).await?;
        Ok(entries.iter().filter(|d| d.created_at >= since).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::kv::MemoryKvStore;
    use std::sync::Arc;

    async fn store() -> Store {
        let db = Database::connect_memory().await.unwrap();
        Store::new(db, Arc::new(MemoryKvStore::new()))
    }

    #[tokio::test]
    async fn test_rate_counter_increments() {
        let store = store().await;
        let repo = LimitsRepository::new(&store);

        let first = repo
            .increment_rate_counter("cockpit_write", "global", "2026-02-01T10:00")
            .await
            .unwrap();
        let second = repo
            .increment_rate_counter("cockpit_write", "global", "2026-02-01T10:00")
            .await
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[tokio::test]
    async fn test_quota_tracks_usage_against_limits() {
        let store = store().await;
        let repo = LimitsRepository::new(&store);

        let quota = repo
            .increment_quota("agent_turn", "group-a", "2026-02-01", 80, 100)
            .await
            .unwrap();
        assert_eq!(quota.used, 1);
        assert_eq!(quota.hard_limit, 100);
    }

    #[tokio::test]
    async fn test_nonce_claim_rejects_replay() {
        let store = store().await;
        let repo = LimitsRepository::new(&store);
        let nonce = Nonce {
            request_id: "req-1".to_string(),
            received_at: Utc::now(),
        };

        repo.claim_nonce(&nonce).await.unwrap();
        let replay = repo.claim_nonce(&nonce).await;
        assert!(matches!(replay, Err(StorageError::AlreadyClaimed(_))));
    }

    #[tokio::test]
    async fn test_denial_log_counts() {
        let store = store().await;
        let repo = LimitsRepository::new(&store);
        let now = Utc::now();

        repo.log_denial(&LimitDenial {
            op: "cockpit_write".to_string(),
            scope_key: "global".to_string(),
            code: "RATE_LIMIT_EXCEEDED".to_string(),
            created_at: now,
        })
        .await
        .unwrap();

        let count = repo.denials_since(now - chrono::Duration::hours(1)).await.unwrap();
        assert_eq!(count, 1);
    }
}

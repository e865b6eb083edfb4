//! The agent lock (spec.md §4.H): a single process-wide boolean ensuring
//! at most one agent invocation runs at a time, regardless of whether the
//! caller is the router, the scheduler, or the governance loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Guards agent execution process-wide. Cheaply cloneable; every clone
/// shares the same underlying flag.
#[derive(Clone, Default)]
pub struct AgentLock {
    held: Arc<AtomicBool>,
}

impl AgentLock {
    /// Build a released lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to take the lock. Returns `true` exactly once per holder;
    /// a caller that receives `false` must defer its work to the next
    /// tick rather than queue it.
    #[must_use]
    pub fn acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the lock, making it available to the next `acquire` call.
    pub fn release(&self) {
        self.held.store(false, Ordering::Release);
    }

    /// Whether the lock is currently held, for status reporting.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_succeeds_once_then_fails() {
        let lock = AgentLock::new();
        assert!(lock.acquire());
        assert!(!lock.acquire());
    }

    #[test]
    fn test_release_allows_reacquire() {
        let lock = AgentLock::new();
        assert!(lock.acquire());
        lock.release();
        assert!(lock.acquire());
    }

    #[test]
    fn test_clones_share_state() {
        let lock = AgentLock::new();
        let clone = lock.clone();
        assert!(lock.acquire());
        assert!(!clone.acquire());
    }

    #[tokio::test]
    async fn test_concurrent_acquire_only_one_wins() {
        let lock = AgentLock::new();
        let attempts = futures::future::join_all((0..8).map(|_| {
            let lock = lock.clone();
            tokio::spawn(async move { lock.acquire() })
        }))
        .await;

        let wins = attempts
            .into_iter()
            .filter(|result| *result.as_ref().unwrap())
            .count();
        assert_eq!(wins, 1);
    }
}

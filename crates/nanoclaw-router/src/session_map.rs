//! Per-key session/turn tracking, generalized from the teacher's
//! per-channel `ChannelSession` map over `chat_jid: String` (or any other
//! hashable key a future caller needs).
//!
//! This sits alongside [`crate::lock::AgentLock`], not in place of it:
//! the lock serializes agent *execution* process-wide, while this map
//! caches each key's resumable session id and flags whether a turn for
//! that key is currently in flight, so a second attempt on the same key
//! (e.g. a scheduler tick landing on a chat the router is mid-turn on)
//! can be told to back off without a storage round trip.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use nanoclaw_core::SessionId;
use tokio::sync::RwLock;

/// One key's cached session state.
#[derive(Debug, Clone, Default)]
struct KeyState {
    session_id: Option<SessionId>,
    turn_in_progress: bool,
}

struct Inner<K> {
    sessions: HashMap<K, KeyState>,
    creating: HashSet<K>,
}

impl<K> Default for Inner<K> {
    fn default() -> Self {
        Self {
            sessions: HashMap::new(),
            creating: HashSet::new(),
        }
    }
}

/// Result of attempting to start a turn on a key that has no cached
/// session yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStartResult {
    /// This call is the first to claim creation; it owns running the
    /// turn and must later call [`SessionMap::finish_creation`].
    Claimed,
    /// Another caller already claimed creation for this key; this call
    /// must defer.
    CreationInProgress,
    /// A session already exists and a turn was started on it.
    Started(SessionId),
    /// A session already exists but a turn is already in progress on it.
    TurnBusy,
}

/// Per-key session cache and turn-in-progress tracker.
///
/// Cloning shares the underlying state (an `Arc<RwLock<..>>`), matching
/// the teacher's `SessionMap` clone semantics.
pub struct SessionMap<K> {
    inner: Arc<RwLock<Inner<K>>>,
}

impl<K> Clone for SessionMap<K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K> Default for SessionMap<K> {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }
}

impl<K> SessionMap<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// Build an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached session id for `key`, if any.
    pub async fn get_session_id(&self, key: &K) -> Option<SessionId> {
        self.inner
            .read()
            .await
            .sessions
            .get(key)
            .and_then(|state| state.session_id.clone())
    }

    /// Cache a session id for `key`, clearing any in-flight creation
    /// claim.
    pub async fn insert(&self, key: K, session_id: SessionId) {
        let mut inner = self.inner.write().await;
        inner.creating.remove(&key);
        inner.sessions.entry(key).or_default().session_id = Some(session_id);
    }

    /// Atomically check whether `key` has neither an existing session
    /// nor an in-flight creation, and if so, claim creation.
    #[must_use]
    pub async fn try_claim_creation(&self, key: &K) -> bool {
        let mut inner = self.inner.write().await;
        if inner.sessions.contains_key(key) || inner.creating.contains(key) {
            return false;
        }
        inner.creating.insert(key.clone());
        true
    }

    /// Release a creation claim without ever finishing it (the attempt
    /// failed before a session id was obtained).
    pub async fn cancel_creation(&self, key: &K) {
        self.inner.write().await.creating.remove(key);
    }

    /// Attempt to start a turn on `key`, handling every combination of
    /// "has a session", "is being created", and "turn already running" in
    /// one atomic step.
    pub async fn try_start_turn(&self, key: &K) -> TurnStartResult {
        let mut inner = self.inner.write().await;
        if inner.creating.contains(key) {
            return TurnStartResult::CreationInProgress;
        }
        match inner.sessions.get_mut(key) {
            Some(state) if state.turn_in_progress => TurnStartResult::TurnBusy,
            Some(state) => {
                state.turn_in_progress = true;
                TurnStartResult::Started(
                    state
                        .session_id
                        .clone()
                        .expect("a tracked session always has a session id"),
                )
            }
            None => {
                inner.creating.insert(key.clone());
                TurnStartResult::Claimed
            }
        }
    }

    /// Finish a creation claim, caching the new session id and marking
    /// its turn as in progress in one step.
    pub async fn finish_creation_and_start_turn(&self, key: K, session_id: SessionId) {
        let mut inner = self.inner.write().await;
        inner.creating.remove(&key);
        inner.sessions.insert(
            key,
            KeyState {
                session_id: Some(session_id),
                turn_in_progress: true,
            },
        );
    }

    /// Mark `key`'s turn as finished, whether it succeeded or failed.
    pub async fn finish_turn(&self, key: &K) {
        if let Some(state) = self.inner.write().await.sessions.get_mut(key) {
            state.turn_in_progress = false;
        }
    }

    /// Whether `key` currently has a turn in progress.
    pub async fn is_turn_in_progress(&self, key: &K) -> bool {
        self.inner
            .read()
            .await
            .sessions
            .get(key)
            .is_some_and(|state| state.turn_in_progress)
    }

    /// Forget everything cached for `key`, returning its prior session id
    /// if any.
    pub async fn remove(&self, key: &K) -> Option<SessionId> {
        let mut inner = self.inner.write().await;
        inner.creating.remove(key);
        inner.sessions.remove(key).and_then(|state| state.session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_session_id_absent_by_default() {
        let map: SessionMap<String> = SessionMap::new();
        assert_eq!(map.get_session_id(&"chat-1".to_string()).await, None);
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let map: SessionMap<String> = SessionMap::new();
        map.insert("chat-1".to_string(), SessionId::new("s1")).await;
        assert_eq!(
            map.get_session_id(&"chat-1".to_string()).await,
            Some(SessionId::new("s1"))
        );
    }

    #[tokio::test]
    async fn test_try_claim_creation_only_succeeds_once() {
        let map: SessionMap<String> = SessionMap::new();
        let key = "chat-1".to_string();
        assert!(map.try_claim_creation(&key).await);
        assert!(!map.try_claim_creation(&key).await);
    }

    #[tokio::test]
    async fn test_try_start_turn_on_fresh_key_claims_creation() {
        let map: SessionMap<String> = SessionMap::new();
        let key = "chat-1".to_string();
        assert_eq!(map.try_start_turn(&key).await, TurnStartResult::Claimed);
    }

    #[tokio::test]
    async fn test_try_start_turn_on_existing_session_starts() {
        let map: SessionMap<String> = SessionMap::new();
        let key = "chat-1".to_string();
        map.insert(key.clone(), SessionId::new("s1")).await;

        let result = map.try_start_turn(&key).await;
        assert_eq!(result, TurnStartResult::Started(SessionId::new("s1")));
        assert!(map.is_turn_in_progress(&key).await);
    }

    #[tokio::test]
    async fn test_try_start_turn_busy_when_already_running() {
        let map: SessionMap<String> = SessionMap::new();
        let key = "chat-1".to_string();
        map.insert(key.clone(), SessionId::new("s1")).await;
        map.try_start_turn(&key).await;

        let result = map.try_start_turn(&key).await;
        assert_eq!(result, TurnStartResult::TurnBusy);
    }

    #[tokio::test]
    async fn test_finish_turn_clears_busy_flag() {
        let map: SessionMap<String> = SessionMap::new();
        let key = "chat-1".to_string();
        map.insert(key.clone(), SessionId::new("s1")).await;
        map.try_start_turn(&key).await;
        map.finish_turn(&key).await;
        assert!(!map.is_turn_in_progress(&key).await);
    }

    #[tokio::test]
    async fn test_remove_clears_everything() {
        let map: SessionMap<String> = SessionMap::new();
        let key = "chat-1".to_string();
        map.insert(key.clone(), SessionId::new("s1")).await;

        let removed = map.remove(&key).await;
        assert_eq!(removed, Some(SessionId::new("s1")));
        assert_eq!(map.get_session_id(&key).await, None);
    }

    #[tokio::test]
    async fn test_concurrent_claim_creation_only_one_wins() {
        let map: SessionMap<String> = SessionMap::new();
        let key = "chat-1".to_string();

        let attempts = futures::future::join_all((0..8).map(|_| {
            let map = map.clone();
            let key = key.clone();
            tokio::spawn(async move { map.try_claim_creation(&key).await })
        }))
        .await;

        let wins = attempts
            .into_iter()
            .filter(|r| *r.as_ref().unwrap())
            .count();
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn test_string_keys_work() {
        let map: SessionMap<String> = SessionMap::new();
        map.insert("120363@g.us".to_string(), SessionId::new("s1"))
            .await;
        assert!(map.get_session_id(&"120363@g.us".to_string()).await.is_some());
    }
}

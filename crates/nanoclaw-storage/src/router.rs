//! Router & Agent Lock repository: `RouterState` and `Session`.

use nanoclaw_core::{ChatJid, RouterState, Session};

use crate::error::StorageResult;
use crate::store::Store;

const ROUTER_STATE_ID: &str = "singleton";
const ROUTER_STATE_TABLE: &str = "router_state";
const SESSION_TABLE: &str = "session";

/// Typed access to the router's persisted cursors and chat sessions.
pub struct RouterRepository<'a> {
    store: &'a Store,
}

impl<'a> RouterRepository<'a> {
    /// Build a repository over `store`.
    #[must_use]
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Load the singleton router cursor state, defaulting to an empty
    /// state if this is a fresh install.
    pub async fn load_state(&self) -> StorageResult<RouterState> {
        Ok(self
            .store
            .get(ROUTER_STATE_TABLE, ROUTER_STATE_ID)
            .await?
            .unwrap_or_default())
    }

    /// Persist the router cursor state.
    pub async fn save_state(&self, state: &RouterState) -> StorageResult<()> {
        self.store
            .upsert(ROUTER_STATE_TABLE, ROUTER_STATE_ID, state)
            .await
    }

    /// Load a chat's session mapping, if one has been established.
    pub async fn get_session(&self, chat_jid: &ChatJid) -> StorageResult<Option<Session>> {
        self.store.get(SESSION_TABLE, &chat_jid.0).await
    }

    /// Create or replace a chat's session mapping.
    pub async fn put_session(&self, session: &Session) -> StorageResult<()> {
        self.store
            .upsert(SESSION_TABLE, &session.chat_jid.0, session)
            .await
    }

    /// Explicitly remove a chat's session mapping.
    pub async fn delete_session(&self, chat_jid: &ChatJid) -> StorageResult<()> {
        self.store.delete(SESSION_TABLE, &chat_jid.0).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::kv::MemoryKvStore;
    use chrono::Utc;
    use nanoclaw_core::SessionId;
    use std::sync::Arc;

    async fn store() -> Store {
        let db = Database::connect_memory().await.unwrap();
        Store::new(db, Arc::new(MemoryKvStore::new()))
    }

    #[tokio::test]
    async fn test_router_state_defaults_when_missing() {
        let store = store().await;
        let repo = RouterRepository::new(&store);
        let state = repo.load_state().await.unwrap();
        assert!(state.last_timestamp.is_none());
    }

    #[tokio::test]
    async fn test_router_state_roundtrip() {
        let store = store().await;
        let repo = RouterRepository::new(&store);
        let mut state = repo.load_state().await.unwrap();
        state.observe(Utc::now());
        repo.save_state(&state).await.unwrap();

        let reloaded = repo.load_state().await.unwrap();
        assert_eq!(reloaded.last_timestamp, state.last_timestamp);
    }

    #[tokio::test]
    async fn test_session_replace_on_update() {
        let store = store().await;
        let repo = RouterRepository::new(&store);
        let chat = ChatJid::new("chat-1");

        repo.put_session(&Session {
            chat_jid: chat.clone(),
            session_id: SessionId::new("s1"),
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

        repo.put_session(&Session {
            chat_jid: chat.clone(),
            session_id: SessionId::new("s2"),
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

        let session = repo.get_session(&chat).await.unwrap().unwrap();
        assert_eq!(session.session_id.0, "s2");
    }
}

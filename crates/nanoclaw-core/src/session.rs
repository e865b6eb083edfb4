//! Session and router-cursor data model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChatJid, SessionId};

/// Mapping `chat_jid -> session_id` representing a resumable agent
/// conversation. Created when an agent first produces a session id,
/// replaced on subsequent results, deleted explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The chat this session belongs to.
    pub chat_jid: ChatJid,
    /// The agent-assigned session identifier.
    pub session_id: SessionId,
    /// When this mapping was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Two process-wide cursors persisted across restarts: the last message
/// timestamp observed by the router, and a per-chat last-processed
/// timestamp used for the advance/rollback discipline in the router.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterState {
    /// Last message timestamp observed by the router, across all chats.
    pub last_timestamp: Option<DateTime<Utc>>,
    /// Per-chat last-processed-by-agent timestamp.
    pub last_agent_timestamp: HashMap<String, DateTime<Utc>>,
}

impl RouterState {
    /// Read the per-chat cursor, if any.
    #[must_use]
    pub fn agent_cursor(&self, chat_jid: &ChatJid) -> Option<DateTime<Utc>> {
        self.last_agent_timestamp.get(chat_jid.as_str()).copied()
    }

    /// Set the per-chat cursor.
    pub fn set_agent_cursor(&mut self, chat_jid: &ChatJid, timestamp: DateTime<Utc>) {
        self.last_agent_timestamp
            .insert(chat_jid.as_str().to_string(), timestamp);
    }

    /// Observe a freshly seen message timestamp, advancing the global
    /// high-water mark if it is newer.
    pub fn observe(&mut self, timestamp: DateTime<Utc>) {
        if self.last_timestamp.is_none_or(|prev| timestamp > prev) {
            self.last_timestamp = Some(timestamp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_agent_cursor_roundtrip() {
        let mut state = RouterState::default();
        let chat = ChatJid::new("chat-1");
        assert_eq!(state.agent_cursor(&chat), None);

        let t = Utc.timestamp_opt(100, 0).unwrap();
        state.set_agent_cursor(&chat, t);
        assert_eq!(state.agent_cursor(&chat), Some(t));
    }

    #[test]
    fn test_observe_only_advances() {
        let mut state = RouterState::default();
        let earlier = Utc.timestamp_opt(100, 0).unwrap();
        let later = Utc.timestamp_opt(200, 0).unwrap();

        state.observe(later);
        state.observe(earlier);
        assert_eq!(state.last_timestamp, Some(later));
    }
}

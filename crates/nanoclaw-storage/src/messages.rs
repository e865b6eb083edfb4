//! Message repository: the inbound/outbound chat log the router reads by
//! cursor (spec.md §3, "Message").

use chrono::{DateTime, Utc};
use nanoclaw_core::{ChatJid, Message};

use crate::error::StorageResult;
use crate::store::Store;

const TABLE: &str = "message";

/// Typed access to the `message` table.
pub struct MessageRepository<'a> {
    store: &'a Store,
}

impl<'a> MessageRepository<'a> {
    /// Build a repository over `store`.
    #[must_use]
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Record an inbound or outbound message. Upserting on `message_id`
    /// makes re-delivery from a flaky channel driver idempotent.
    pub async fn record(&self, message: &Message) -> StorageResult<()> {
        self.store
            .upsert(TABLE, message.message_id.as_str(), message)
            .await
    }

    /// Every message in `chat` with `timestamp` strictly after `cursor`
    /// (or every message, if `cursor` is `None`), ordered by the
    /// `(timestamp, message_id)` total order.
    pub async fn after_cursor(
        &self,
        chat_jid: &ChatJid,
        cursor: Option<DateTime<Utc>>,
    ) -> StorageResult<Vec<Message>> {
        let mut response = self
            .store
            .db()
            .client()
            .query(
                "SELECT * FROM message \
                 WHERE chat_jid = $chat_jid AND ($cursor IS NONE OR timestamp > $cursor) \
                 ORDER BY timestamp ASC, message_id ASC",
            )
            .bind(("chat_jid", chat_jid.0.clone()))
            .bind(("cursor", cursor))
            .await
            .map_err(crate::error::StorageError::from)?;
        let messages: Vec<Message> = response.take(0).map_err(crate::error::StorageError::from)?;
        Ok(messages)
    }

    /// Every chat with at least one message after its own cursor,
    /// distinct, used by the router to find chats with unprocessed
    /// traffic without scanning the whole table per tick.
    pub async fn chats_with_traffic_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> StorageResult<Vec<ChatJid>> {
        let mut response = self
            .store
            .db()
            .client()
            .query(
                "SELECT array::distinct(chat_jid) AS chats FROM message \
                 WHERE $since IS NONE OR timestamp > $since",
            )
            .bind(("since", since))
            .await
            .map_err(crate::error::StorageError::from)?;
        #[derive(serde::Deserialize)]
        struct Row {
            chats: Vec<String>,
        }
        let rows: Vec<Row> = response.take(0).map_err(crate::error::StorageError::from)?;
        Ok(rows
            .into_iter()
            .flat_map(|r| r.chats)
            .map(ChatJid::new)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::kv::MemoryKvStore;
    use nanoclaw_core::MessageId;
    use std::sync::Arc;

    async fn store() -> Store {
        let db = Database::connect_memory().await.unwrap();
        Store::new(db, Arc::new(MemoryKvStore::new()))
    }

    fn msg(id: &str, chat: &str, secs: i64) -> Message {
        Message {
            message_id: MessageId::new(id),
            chat_jid: ChatJid::new(chat),
            sender: "user-1".to_string(),
            sender_name: None,
            content: "hi".to_string(),
            timestamp: DateTime::from_timestamp(secs, 0).unwrap(),
            from_self: false,
        }
    }

    #[tokio::test]
    async fn test_after_cursor_excludes_earlier_messages() {
        let store = store().await;
        let repo = MessageRepository::new(&store);
        let chat = ChatJid::new("chat-1");

        repo.record(&msg("m1", "chat-1", 100)).await.unwrap();
        repo.record(&msg("m2", "chat-1", 200)).await.unwrap();

        let after = repo
            .after_cursor(&chat, Some(DateTime::from_timestamp(100, 0).unwrap()))
            .await
            .unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].message_id.as_str(), "m2");
    }

    #[tokio::test]
    async fn test_after_cursor_none_returns_all() {
        let store = store().await;
        let repo = MessageRepository::new(&store);
        let chat = ChatJid::new("chat-1");

        repo.record(&msg("m1", "chat-1", 100)).await.unwrap();
        repo.record(&msg("m2", "chat-1", 200)).await.unwrap();

        let all = repo.after_cursor(&chat, None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_after_cursor_orders_ascending() {
        let store = store().await;
        let repo = MessageRepository::new(&store);
        let chat = ChatJid::new("chat-1");

        repo.record(&msg("later", "chat-1", 200)).await.unwrap();
        repo.record(&msg("earlier", "chat-1", 100)).await.unwrap();

        let all = repo.after_cursor(&chat, None).await.unwrap();
        assert_eq!(all[0].message_id.as_str(), "earlier");
        assert_eq!(all[1].message_id.as_str(), "later");
    }
}

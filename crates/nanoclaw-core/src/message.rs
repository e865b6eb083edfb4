//! Chat message data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChatJid, MessageId};

/// A single inbound or outbound chat entry.
///
/// `(chat_jid, timestamp, message_id)` totally orders messages within a
/// chat; callers that need a stable processing order should sort on that
/// tuple rather than on `timestamp` alone, since channel clocks can produce
/// duplicate timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message.
    pub message_id: MessageId,
    /// Conversation this message belongs to.
    pub chat_jid: ChatJid,
    /// Opaque sender identifier (channel-specific).
    pub sender: String,
    /// Human-readable sender name, if known.
    pub sender_name: Option<String>,
    /// Message body.
    pub content: String,
    /// When the channel reports this message as sent/received.
    pub timestamp: DateTime<Utc>,
    /// Whether this message was produced by NanoClaw itself (an outbound
    /// echo) rather than by a remote participant.
    pub from_self: bool,
}

impl Message {
    /// Sort key implementing the `(chat_jid, timestamp, message_id)` total
    /// order described by the data model.
    #[must_use]
    pub fn order_key(&self) -> (&ChatJid, DateTime<Utc>, &MessageId) {
        (&self.chat_jid, self.timestamp, &self.message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msg(id: &str, ts: i64) -> Message {
        Message {
            message_id: MessageId::new(id),
            chat_jid: ChatJid::new("chat-1"),
            sender: "user-1".to_string(),
            sender_name: Some("Alice".to_string()),
            content: "hi".to_string(),
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            from_self: false,
        }
    }

    #[test]
    fn test_order_key_orders_by_timestamp_then_id() {
        let mut messages = vec![msg("b", 100), msg("a", 50)];
        messages.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        assert_eq!(messages[0].message_id.as_str(), "a");
        assert_eq!(messages[1].message_id.as_str(), "b");
    }
}

//! Outbound message delivery: a channel driver abstraction plus a
//! per-chat queue for buffering replies while the channel is briefly
//! disconnected.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use nanoclaw_core::ChatJid;
use tokio::sync::Mutex;

/// Delivers outbound text to a chat on some external channel (WhatsApp,
/// Discord, ...). Implementations own their own connection/reconnect
/// logic; the router only calls `send` and, around an agent turn,
/// `set_typing`.
#[async_trait]
pub trait ChannelDriver: Send + Sync {
    /// Deliver `text` to `chat`.
    async fn send(&self, chat: &ChatJid, text: &str) -> bool;

    /// Toggle a typing indicator for `chat`. Channels without one are a
    /// no-op.
    async fn set_typing(&self, _chat: &ChatJid, _typing: bool) {}

    /// Whether the channel is currently reachable.
    async fn is_connected(&self) -> bool {
        true
    }
}

/// Per-chat FIFO of outbound text, for buffering replies composed while
/// the channel is disconnected so they can be flushed on reconnect.
#[derive(Clone, Default)]
pub struct OutboundQueue {
    inner: Arc<Mutex<HashMap<ChatJid, VecDeque<String>>>>,
}

impl OutboundQueue {
    /// Build an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` to `chat`'s queue.
    pub async fn enqueue(&self, chat: ChatJid, text: String) {
        self.inner.lock().await.entry(chat).or_default().push_back(text);
    }

    /// Remove and return every queued message for `chat`, in order.
    pub async fn drain(&self, chat: &ChatJid) -> Vec<String> {
        self.inner
            .lock()
            .await
            .get_mut(chat)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    /// Whether `chat` has any queued messages.
    pub async fn has_pending(&self, chat: &ChatJid) -> bool {
        self.inner
            .lock()
            .await
            .get(chat)
            .is_some_and(|queue| !queue.is_empty())
    }
}

/// Deliver `text` to `chat` via `driver`, buffering it in `queue` instead
/// if the channel is currently disconnected.
pub async fn deliver_or_queue(
    driver: &dyn ChannelDriver,
    queue: &OutboundQueue,
    chat: &ChatJid,
    text: String,
) {
    if driver.is_connected().await && driver.send(chat, &text).await {
        return;
    }
    queue.enqueue(chat.clone(), text).await;
}

/// Flush everything queued for `chat` through `driver`, re-queuing
/// anything that fails to send so order is preserved for the next
/// attempt.
pub async fn flush_pending(driver: &dyn ChannelDriver, queue: &OutboundQueue, chat: &ChatJid) {
    for text in queue.drain(chat).await {
        if !driver.send(chat, &text).await {
            queue.enqueue(chat.clone(), text).await;
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FlakyDriver {
        connected: AtomicBool,
        sent: Mutex<Vec<String>>,
        fail_next: AtomicUsize,
    }

    impl FlakyDriver {
        fn new(connected: bool) -> Self {
            Self {
                connected: AtomicBool::new(connected),
                sent: Mutex::new(Vec::new()),
                fail_next: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChannelDriver for FlakyDriver {
        async fn send(&self, _chat: &ChatJid, text: &str) -> bool {
            if self.fail_next.load(Ordering::SeqCst) > 0 {
                self.fail_next.fetch_sub(1, Ordering::SeqCst);
                return false;
            }
            self.sent.lock().await.push(text.to_string());
            true
        }

        async fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_deliver_sends_when_connected() {
        let driver = FlakyDriver::new(true);
        let queue = OutboundQueue::new();
        let chat = ChatJid::new("chat-1");

        deliver_or_queue(&driver, &queue, &chat, "hi".to_string()).await;

        assert_eq!(driver.sent.lock().await.as_slice(), ["hi".to_string()]);
        assert!(!queue.has_pending(&chat).await);
    }

    #[tokio::test]
    async fn test_deliver_queues_when_disconnected() {
        let driver = FlakyDriver::new(false);
        let queue = OutboundQueue::new();
        let chat = ChatJid::new("chat-1");

        deliver_or_queue(&driver, &queue, &chat, "hi".to_string()).await;

        assert!(driver.sent.lock().await.is_empty());
        assert!(queue.has_pending(&chat).await);
    }

    #[tokio::test]
    async fn test_flush_pending_delivers_in_order() {
        let driver = FlakyDriver::new(true);
        let queue = OutboundQueue::new();
        let chat = ChatJid::new("chat-1");

        queue.enqueue(chat.clone(), "one".to_string()).await;
        queue.enqueue(chat.clone(), "two".to_string()).await;

        flush_pending(&driver, &queue, &chat).await;

        assert_eq!(
            driver.sent.lock().await.as_slice(),
            ["one".to_string(), "two".to_string()]
        );
        assert!(!queue.has_pending(&chat).await);
    }

    #[tokio::test]
    async fn test_flush_pending_requeues_on_failure_and_stops() {
        let driver = FlakyDriver::new(true);
        driver.fail_next.store(1, Ordering::SeqCst);
        let queue = OutboundQueue::new();
        let chat = ChatJid::new("chat-1");

        queue.enqueue(chat.clone(), "one".to_string()).await;
        queue.enqueue(chat.clone(), "two".to_string()).await;

        flush_pending(&driver, &queue, &chat).await;

        assert!(driver.sent.lock().await.is_empty());
        assert!(queue.has_pending(&chat).await);
    }
}

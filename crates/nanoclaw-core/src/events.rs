//! Internal event bus.
//!
//! Every background loop publishes here; the Ops HTTP API's `/ops/events`
//! SSE endpoint is one subscriber among potentially several (logging
//! sinks, tests).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::ids::{ChatJid, GovTaskId, WorkerId};

/// Default capacity of the broadcast channel backing the bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Something that happened inside the host, worth surfacing to operators
/// or other in-process subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NanoClawEvent {
    /// The router dispatched a prompt for a chat.
    RouterDispatched {
        /// Chat the dispatch was for.
        chat_jid: ChatJid,
        /// When this happened.
        at: DateTime<Utc>,
    },
    /// The router rolled a chat's cursor back after an agent error.
    RouterRolledBack {
        /// Chat whose cursor was rolled back.
        chat_jid: ChatJid,
        /// When this happened.
        at: DateTime<Utc>,
    },
    /// A `GovTask` transitioned state.
    GovTransition {
        /// The task that transitioned.
        task_id: GovTaskId,
        /// Prior state, as its wire name.
        from: String,
        /// New state, as its wire name.
        to: String,
        /// When this happened.
        at: DateTime<Utc>,
    },
    /// A limits check denied an operation.
    LimitDenied {
        /// Operation family that was denied.
        op: String,
        /// Deny code.
        code: String,
        /// When this happened.
        at: DateTime<Utc>,
    },
    /// A worker's reachability changed.
    WorkerStatusChanged {
        /// The worker whose status changed.
        worker_id: WorkerId,
        /// New status, as its wire name.
        status: String,
        /// When this happened.
        at: DateTime<Utc>,
    },
}

/// Tracks how many subscribers are currently attached, independent of the
/// broadcast channel's own internal bookkeeping, so callers can report a
/// live count without racing a fresh `subscribe()` call.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    count: AtomicUsize,
}

impl SubscriberRegistry {
    fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
        }
    }

    fn increment(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }

    /// Current number of live subscribers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// Broadcast bus for [`NanoClawEvent`]s.
pub struct EventBus {
    sender: broadcast::Sender<Arc<NanoClawEvent>>,
    registry: Arc<SubscriberRegistry>,
}

impl EventBus {
    /// Build a bus with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Build a bus with an explicit channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            registry: Arc::new(SubscriberRegistry::new()),
        }
    }

    /// Publish an event to all current subscribers. Returns the number of
    /// subscribers the event was sent to (zero if there are none; this is
    /// not an error).
    pub fn publish(&self, event: NanoClawEvent) -> usize {
        self.sender.send(Arc::new(event)).unwrap_or(0)
    }

    /// Subscribe to future events.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.registry.increment();
        EventReceiver {
            receiver: self.sender.subscribe(),
            registry: self.registry.clone(),
        }
    }

    /// Number of subscribers currently attached.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

/// A live subscription to an [`EventBus`].
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<NanoClawEvent>>,
    registry: Arc<SubscriberRegistry>,
}

impl EventReceiver {
    /// Await the next event, skipping past any events missed due to
    /// lagging (the caller is told nothing about the gap beyond a debug
    /// log; callers needing gap-detection should poll
    /// [`Self::try_recv`] instead).
    pub async fn recv(&mut self) -> Option<Arc<NanoClawEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event bus subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking poll for the next event.
    pub fn try_recv(&mut self) -> Option<Arc<NanoClawEvent>> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "event bus subscriber lagged");
                None
            }
            Err(_) => None,
        }
    }
}

impl Drop for EventReceiver {
    fn drop(&mut self) {
        self.registry.decrement();
    }
}

//! NanoClaw Core - shared data model, error types, and event bus for the
//! NanoClaw multi-channel assistant host.
//!
//! This crate provides:
//! - Opaque identifier newtypes for every entity in the data model
//! - The data model itself: messages, sessions, tasks, governed work
//!   items, workers, limits counters, and memories
//! - A broadcast event bus shared by every background loop and the ops
//!   HTTP API's SSE endpoint
//! - Error types common to core data model validation

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod error;
pub mod events;
pub mod governance;
pub mod ids;
pub mod limits;
pub mod memory;
pub mod message;
pub mod product;
pub mod session;
pub mod snapshot;
pub mod task;
pub mod worker;

pub use error::{CoreError, CoreResult};
pub use events::{EventBus, EventReceiver, NanoClawEvent, SubscriberRegistry};
pub use governance::{
    ContextPack, DispatchStatus, GovActivity, GovApproval, GovDispatch, GovScope, GovState,
    GovTask, OverrideReason,
};
pub use ids::{
    ChatJid, DispatchKey, GovTaskId, GroupFolder, MemoryId, MessageId, ProductId, SessionId,
    TaskId, WorkerId,
};
pub use limits::{Breaker, BreakerState, LimitDenial, Nonce, QuotaDaily, RateCounter};
pub use memory::{ContentScan, Memory, MemoryAccessLogEntry, MemoryLevel};
pub use message::Message;
pub use product::{Product, ProductStatus};
pub use session::{RouterState, Session};
pub use snapshot::{CurrentTaskEntry, CurrentTasksSnapshot, ExtCapabilities, GovPipelineSnapshot};
pub use task::{ContextMode, ScheduleType, Task, TaskStatus};
pub use worker::{
    CompletionCallback, CompletionStatus, DispatchPayload, HealthReply, Worker, WorkerStatus,
};

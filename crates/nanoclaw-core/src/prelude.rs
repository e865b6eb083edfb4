//! Prelude module - commonly used types for convenient import.
//!
//! Use `use nanoclaw_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{CoreError, CoreResult};

// Event bus
pub use crate::{EventBus, EventReceiver, NanoClawEvent, SubscriberRegistry};

// Identifiers
pub use crate::{
    ChatJid, DispatchKey, GovTaskId, GroupFolder, MemoryId, MessageId, ProductId, SessionId,
    TaskId, WorkerId,
};

// Data model
pub use crate::{
    Breaker, BreakerState, ContentScan, ContextMode, ContextPack, CurrentTaskEntry,
    CurrentTasksSnapshot, DispatchStatus, ExtCapabilities, GovActivity, GovApproval, GovDispatch,
    GovPipelineSnapshot, GovScope, GovState, GovTask, LimitDenial, Memory, MemoryAccessLogEntry,
    MemoryLevel, Message, Nonce, OverrideReason, QuotaDaily, RateCounter, RouterState,
    ScheduleType, Session, Task, TaskStatus, Worker, WorkerStatus,
};

//! Prelude module - commonly used types for convenient import.
//!
//! Use `use nanoclaw_router::prelude::*;` to import all essential types.

pub use crate::{RouterError, RouterResult};

pub use crate::{AgentClient, AgentEvent, AgentEventStream, AgentStatus, AgentTurnRequest, TurnMode};

pub use crate::AgentLock;

pub use crate::{SessionMap, TurnStartResult};

pub use crate::Trigger;

pub use crate::{deliver_or_queue, flush_pending, ChannelDriver, OutboundQueue};

pub use crate::{run_router_loop, RouterDeps};

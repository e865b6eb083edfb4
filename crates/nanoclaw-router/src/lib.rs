//! NanoClaw Router - inbound message aggregation, trigger detection, and
//! the agent lock (spec.md §4.H).
//!
//! Every tick, [`router_loop::run_router_loop`] scans chats with
//! unprocessed traffic, checks each batch against a configured
//! [`trigger::Trigger`] token, and for a triggering batch runs one agent
//! turn under the process-wide [`lock::AgentLock`] - advancing that
//! chat's persisted cursor before the turn and rolling it back if the
//! turn errors. [`agent::AgentClient`] is the cooperative, cancellable
//! turn abstraction the scheduler and governance loops share with the
//! router.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod agent;
pub mod error;
pub mod lock;
pub mod outbound;
pub mod router_loop;
pub mod session_map;
pub mod trigger;

pub use agent::{
    AgentClient, AgentEvent, AgentEventStream, AgentStatus, AgentTurnRequest, TurnMode,
};
pub use error::{RouterError, RouterResult};
pub use lock::AgentLock;
pub use outbound::{deliver_or_queue, flush_pending, ChannelDriver, OutboundQueue};
pub use router_loop::{run_router_loop, RouterDeps};
pub use session_map::{SessionMap, TurnStartResult};
pub use trigger::Trigger;

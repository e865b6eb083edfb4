//! The model-facing [`AgentClient`] is an external collaborator (spec.md
//! §1 Non-goals): this binary wires the router, scheduler, and
//! governance loops to one, but does not ship one itself.
//!
//! [`UnavailableAgent`] keeps the daemon runnable end-to-end without a
//! real model client plugged in - every turn fails cleanly with
//! [`AgentStatus::Error`] instead of the binary refusing to start.

use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use nanoclaw_router::{AgentClient, AgentEvent, AgentEventStream, AgentTurnRequest};

/// Stand-in [`AgentClient`] until a real model client is wired in.
pub struct UnavailableAgent;

#[async_trait]
impl AgentClient for UnavailableAgent {
    async fn run_turn(&self, _request: AgentTurnRequest) -> AgentEventStream {
        let event = AgentEvent::error("no agent client configured for this host");
        stream::once(async move { event }).boxed()
    }
}

//! Channel drivers (WhatsApp, Discord, ...) are external collaborators
//! (spec.md §1 Non-goals): this binary wires the router's outbound
//! queue and trigger matching to one, but does not ship one itself.
//!
//! [`LoggingChannelDriver`] logs every outbound send instead of
//! delivering it anywhere, keeping the daemon runnable and observable
//! without a real channel plugged in.

use async_trait::async_trait;
use nanoclaw_core::ChatJid;
use nanoclaw_router::ChannelDriver;
use tracing::info;

/// Stand-in [`ChannelDriver`] until a real channel is wired in.
pub struct LoggingChannelDriver;

#[async_trait]
impl ChannelDriver for LoggingChannelDriver {
    async fn send(&self, chat: &ChatJid, text: &str) -> bool {
        info!(chat = %chat, text, "outbound message (no channel driver configured)");
        true
    }
}

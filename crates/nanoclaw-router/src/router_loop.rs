//! The router tick loop (spec.md §4.H): for every chat with traffic,
//! decide whether a trigger fired, hold the agent lock for the duration
//! of a turn, and advance or roll back that chat's cursor depending on
//! the outcome.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use nanoclaw_core::{ChatJid, EventBus, Message, NanoClawEvent, SessionId};
use nanoclaw_storage::messages::MessageRepository;
use nanoclaw_storage::router::RouterRepository;
use nanoclaw_storage::store::Store;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::agent::{AgentClient, AgentStatus, AgentTurnRequest, TurnMode};
use crate::error::{RouterError, RouterResult};
use crate::lock::AgentLock;
use crate::outbound::{deliver_or_queue, ChannelDriver, OutboundQueue};
use crate::session_map::SessionMap;
use crate::trigger::Trigger;

/// Everything the router loop needs to run one tick, bundled so
/// [`run_router_loop`] takes a handful of `Arc`s instead of a dozen
/// arguments.
pub struct RouterDeps {
    /// Persistent store.
    pub store: Arc<Store>,
    /// Agent turn client.
    pub agent: Arc<dyn AgentClient>,
    /// Outbound channel driver.
    pub channel: Arc<dyn ChannelDriver>,
    /// Buffered outbound messages.
    pub outbound: OutboundQueue,
    /// Process-wide agent lock.
    pub lock: AgentLock,
    /// In-memory session/turn cache, keyed by chat.
    pub sessions: SessionMap<ChatJid>,
    /// Event bus for publishing router activity.
    pub events: Arc<EventBus>,
    /// Trigger-word matcher.
    pub trigger: Trigger,
    /// Prefix applied to outbound replies (the assistant's display name).
    pub assistant_name: String,
}

/// Run the router loop until `shutdown` fires, ticking every
/// `poll_interval`.
pub async fn run_router_loop(
    deps: Arc<RouterDeps>,
    poll_interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => {
                info!("router loop shutting down");
                return;
            }
            _ = ticker.tick() => {
                if let Err(err) = process_tick(&deps).await {
                    warn!(error = %err, "router tick failed");
                }
            }
        }
    }
}

/// Scan every chat with any recorded traffic and process whichever ones
/// are trigger-eligible and not already mid-turn.
///
/// Always scans with `since = None` rather than the router's global
/// `last_timestamp` watermark: a chat whose latest batch did not trigger
/// must still be rescanned on the next tick (its own cursor never
/// advanced), even after the watermark has passed its messages. The
/// watermark is still updated via `RouterState::observe` for every
/// message seen, for visibility only.
async fn process_tick(deps: &Arc<RouterDeps>) -> RouterResult<()> {
    let repo = MessageRepository::new(&deps.store);
    let router_repo = RouterRepository::new(&deps.store);

    let mut state = router_repo.load_state().await?;
    let chats = repo.chats_with_traffic_since(None).await?;

    for chat in chats {
        let cursor = state.agent_cursor(&chat);
        let batch = repo.after_cursor(&chat, cursor).await?;
        if batch.is_empty() {
            continue;
        }

        for message in &batch {
            state.observe(message.timestamp);
        }

        if !deps.trigger.matches_any(batch.iter().map(|m| m.content.as_str())) {
            router_repo.save_state(&state).await?;
            continue;
        }

        if deps.sessions.is_turn_in_progress(&chat).await {
            continue;
        }

        if !deps.lock.acquire() {
            continue;
        }

        let result = run_chat_turn(deps, &chat, &batch, &mut state).await;
        deps.lock.release();
        deps.sessions.finish_turn(&chat).await;

        router_repo.save_state(&state).await?;

        if let Err(err) = result {
            warn!(chat = %chat, error = %err, "agent turn failed");
        }
    }

    router_repo.save_state(&state).await?;
    Ok(())
}

async fn run_chat_turn(
    deps: &Arc<RouterDeps>,
    chat: &ChatJid,
    batch: &[Message],
    state: &mut nanoclaw_core::RouterState,
) -> RouterResult<()> {
    let prev_cursor = state.agent_cursor(chat);
    let last_timestamp = batch
        .last()
        .map(|m| m.timestamp)
        .unwrap_or_else(Utc::now);
    state.set_agent_cursor(chat, last_timestamp);

    let session_id = deps.sessions.get_session_id(chat).await;
    let prompt = build_prompt(batch);

    deps.channel.set_typing(chat, true).await;
    let outcome = run_turn_to_completion(
        deps.agent.as_ref(),
        AgentTurnRequest {
            prompt: TurnMode::Interactive.label(&prompt),
            session_id: session_id.clone(),
            mode: TurnMode::Interactive,
        },
    )
    .await;
    deps.channel.set_typing(chat, false).await;

    match outcome {
        Ok((replies, new_session_id)) => {
            if let Some(new_session_id) = new_session_id {
                deps.sessions.insert(chat.clone(), new_session_id.clone()).await;
                let router_repo = RouterRepository::new(&deps.store);
                router_repo
                    .put_session(&nanoclaw_core::Session {
                        chat_jid: chat.clone(),
                        session_id: new_session_id,
                        updated_at: Utc::now(),
                    })
                    .await?;
            }

            for reply in replies {
                let text = format!("{}: {reply}", deps.assistant_name);
                deliver_or_queue(deps.channel.as_ref(), &deps.outbound, chat, text).await;
            }

            deps.events.publish(NanoClawEvent::RouterDispatched {
                chat_jid: chat.clone(),
                at: Utc::now(),
            });
            Ok(())
        }
        Err(message) => {
            match prev_cursor {
                Some(prev) => state.set_agent_cursor(chat, prev),
                None => {
                    state.last_agent_timestamp.remove(chat.as_str());
                }
            }
            deps.events.publish(NanoClawEvent::RouterRolledBack {
                chat_jid: chat.clone(),
                at: Utc::now(),
            });
            Err(RouterError::AgentError(message))
        }
    }
}

fn build_prompt(batch: &[Message]) -> String {
    batch
        .iter()
        .map(|m| {
            let who = m.sender_name.as_deref().unwrap_or(m.sender.as_str());
            format!("{who}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drain an agent turn's event stream to completion, collecting every
/// `result` chunk and the last session id the agent reported.
///
/// Returns `Err` with the failure message on the first `Error` event.
async fn run_turn_to_completion(
    agent: &dyn AgentClient,
    request: AgentTurnRequest,
) -> Result<(Vec<String>, Option<SessionId>), String> {
    let mut stream = agent.run_turn(request).await;
    let mut replies = Vec::new();
    let mut session_id = None;

    while let Some(event) = stream.next().await {
        if event.session_id.is_some() {
            session_id = event.session_id;
        }
        if let Some(result) = event.result {
            replies.push(result);
        }
        match event.status {
            AgentStatus::Running => continue,
            AgentStatus::Done => break,
            AgentStatus::Error => {
                return Err(event.error.unwrap_or_else(|| "agent error".to_string()));
            }
        }
    }

    Ok((replies, session_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::ChannelDriver;
    use async_trait::async_trait;
    use futures::stream::{self, BoxStream};
    use nanoclaw_storage::db::Database;
    use nanoclaw_storage::kv::MemoryKvStore;
    use std::sync::Mutex as StdMutex;

    struct ScriptedAgent {
        events: Vec<crate::agent::AgentEvent>,
    }

    #[async_trait]
    impl AgentClient for ScriptedAgent {
        async fn run_turn(&self, _request: AgentTurnRequest) -> BoxStream<'static, crate::agent::AgentEvent> {
            stream::iter(self.events.clone()).boxed()
        }
    }

    struct RecordingDriver {
        sent: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl ChannelDriver for RecordingDriver {
        async fn send(&self, _chat: &ChatJid, text: &str) -> bool {
            self.sent.lock().unwrap().push(text.to_string());
            true
        }
    }

    fn make_deps(agent: ScriptedAgent) -> Arc<RouterDeps> {
        Arc::new(RouterDeps {
            store: Arc::new(Store::new(
                futures::executor::block_on(Database::connect_memory()).unwrap(),
                Arc::new(MemoryKvStore::new()),
            )),
            agent: Arc::new(agent),
            channel: Arc::new(RecordingDriver {
                sent: StdMutex::new(Vec::new()),
            }),
            outbound: OutboundQueue::new(),
            lock: AgentLock::new(),
            sessions: SessionMap::new(),
            events: Arc::new(EventBus::new()),
            trigger: Trigger::new("@Andy").unwrap(),
            assistant_name: "Andy".to_string(),
        })
    }

    fn message(id: &str, chat: &str, content: &str, ts: i64) -> Message {
        use chrono::TimeZone;
        Message {
            message_id: nanoclaw_core::MessageId::new(id),
            chat_jid: ChatJid::new(chat),
            sender: "user-1".to_string(),
            sender_name: Some("Alice".to_string()),
            content: content.to_string(),
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            from_self: false,
        }
    }

    #[tokio::test]
    async fn test_tick_ignores_chats_without_trigger() {
        let deps = make_deps(ScriptedAgent { events: vec![] });
        let repo = MessageRepository::new(&deps.store);
        repo.record(&message("m1", "chat-1", "no mention here", 1))
            .await
            .unwrap();

        process_tick(&deps).await.unwrap();
        assert!(!deps.lock.is_held());
    }

    #[tokio::test]
    async fn test_tick_runs_turn_and_delivers_reply() {
        let deps = make_deps(ScriptedAgent {
            events: vec![crate::agent::AgentEvent::done(
                Some("hello there".to_string()),
                Some(SessionId::new("s1")),
            )],
        });
        let repo = MessageRepository::new(&deps.store);
        repo.record(&message("m1", "chat-1", "@Andy hi", 1))
            .await
            .unwrap();

        process_tick(&deps).await.unwrap();

        assert!(!deps.lock.is_held());
        assert_eq!(
            deps.sessions.get_session_id(&ChatJid::new("chat-1")).await,
            Some(SessionId::new("s1"))
        );

        let state = RouterRepository::new(&deps.store).load_state().await.unwrap();
        assert!(state.agent_cursor(&ChatJid::new("chat-1")).is_some());
    }

    #[tokio::test]
    async fn test_tick_rolls_back_cursor_on_agent_error() {
        let deps = make_deps(ScriptedAgent {
            events: vec![crate::agent::AgentEvent::error("boom")],
        });
        let repo = MessageRepository::new(&deps.store);
        repo.record(&message("m1", "chat-1", "@Andy hi", 1))
            .await
            .unwrap();

        process_tick(&deps).await.unwrap();

        let state = RouterRepository::new(&deps.store).load_state().await.unwrap();
        assert_eq!(state.agent_cursor(&ChatJid::new("chat-1")), None);
    }

    #[tokio::test]
    async fn test_run_turn_to_completion_collects_results() {
        let agent = ScriptedAgent {
            events: vec![
                crate::agent::AgentEvent::running("partial"),
                crate::agent::AgentEvent::done(Some("final".to_string()), None),
            ],
        };
        let (replies, session_id) = run_turn_to_completion(
            &agent,
            AgentTurnRequest {
                prompt: "hi".to_string(),
                session_id: None,
                mode: TurnMode::Interactive,
            },
        )
        .await
        .unwrap();

        assert_eq!(replies, vec!["partial".to_string(), "final".to_string()]);
        assert_eq!(session_id, None);
    }

    #[tokio::test]
    async fn test_run_turn_to_completion_stops_on_error() {
        let agent = ScriptedAgent {
            events: vec![
                crate::agent::AgentEvent::running("partial"),
                crate::agent::AgentEvent::error("boom"),
            ],
        };
        let result = run_turn_to_completion(
            &agent,
            AgentTurnRequest {
                prompt: "hi".to_string(),
                session_id: None,
                mode: TurnMode::Interactive,
            },
        )
        .await;

        assert_eq!(result, Err("boom".to_string()));
    }
}

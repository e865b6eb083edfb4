//! The cooperative agent-turn abstraction (spec.md §9's design note): a
//! turn is a lazy finite sequence of `{status, result?, session_id?,
//! error?}` messages the caller drains in order, free to stop early.
//!
//! There is no existing fleet/session abstraction this mirrors; it is
//! shaped directly from the wording above rather than adapted from a
//! teacher module (see DESIGN.md).

use async_trait::async_trait;
use futures::stream::BoxStream;
use nanoclaw_core::SessionId;

/// Where a turn's result stands as the caller drains it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    /// More events may follow.
    Running,
    /// The turn finished; no further events follow.
    Done,
    /// The turn failed; no further events follow.
    Error,
}

/// One message out of a turn's event stream.
#[derive(Debug, Clone)]
pub struct AgentEvent {
    /// Where the turn stands.
    pub status: AgentStatus,
    /// Incremental or final text produced so far, if any.
    pub result: Option<String>,
    /// The session id the turn is running under, if the agent assigned
    /// or changed one. When present, it replaces the stored session.
    pub session_id: Option<SessionId>,
    /// The failure reason, set only when `status` is `Error`.
    pub error: Option<String>,
}

impl AgentEvent {
    /// Build a `Running` event carrying partial text.
    #[must_use]
    pub fn running(result: impl Into<String>) -> Self {
        Self {
            status: AgentStatus::Running,
            result: Some(result.into()),
            session_id: None,
            error: None,
        }
    }

    /// Build the final `Done` event.
    #[must_use]
    pub fn done(result: Option<String>, session_id: Option<SessionId>) -> Self {
        Self {
            status: AgentStatus::Done,
            result,
            session_id,
            error: None,
        }
    }

    /// Build the final `Error` event.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: AgentStatus::Error,
            result: None,
            session_id: None,
            error: Some(message.into()),
        }
    }
}

/// Why a turn was started, independent of its chat/session identity.
///
/// `Scheduled` and `Governance` turns are not user-originated; callers
/// must prefix the prompt with a label marking that before handing it to
/// [`AgentClient::run_turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnMode {
    /// A user's message triggered this turn.
    Interactive,
    /// A scheduled task triggered this turn.
    Scheduled,
    /// A governance transition triggered this turn.
    Governance,
}

impl TurnMode {
    /// The label to prefix onto the prompt for non-interactive modes, or
    /// `None` for `Interactive` turns which need no marking.
    #[must_use]
    pub fn label_prefix(self) -> Option<&'static str> {
        match self {
            Self::Interactive => None,
            Self::Scheduled => Some("[scheduled task]"),
            Self::Governance => Some("[governance]"),
        }
    }

    /// Apply [`Self::label_prefix`] to `prompt`, leaving interactive
    /// prompts untouched.
    #[must_use]
    pub fn label(self, prompt: &str) -> String {
        match self.label_prefix() {
            Some(prefix) => format!("{prefix} {prompt}"),
            None => prompt.to_string(),
        }
    }
}

/// One turn request handed to an [`AgentClient`].
#[derive(Debug, Clone)]
pub struct AgentTurnRequest {
    /// The prompt text, already labeled per [`TurnMode::label`] if
    /// applicable.
    pub prompt: String,
    /// The session to resume, or `None` to start a fresh one.
    pub session_id: Option<SessionId>,
    /// Why this turn was started.
    pub mode: TurnMode,
}

/// A turn's event stream: the caller polls it in order and may drop it
/// to cancel early.
pub type AgentEventStream = BoxStream<'static, AgentEvent>;

/// Runs a single agent turn, modeling its result as a cooperative,
/// cancellable event stream rather than one blocking call.
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Start a turn and return its event stream. Implementations should
    /// begin work eagerly; the stream carries progress as it arrives.
    async fn run_turn(&self, request: AgentTurnRequest) -> AgentEventStream;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use futures::StreamExt;

    struct EchoAgent;

    #[async_trait]
    impl AgentClient for EchoAgent {
        async fn run_turn(&self, request: AgentTurnRequest) -> AgentEventStream {
            let events = vec![
                AgentEvent::running("working..."),
                AgentEvent::done(Some(format!("echo: {}", request.prompt)), request.session_id),
            ];
            stream::iter(events).boxed()
        }
    }

    #[tokio::test]
    async fn test_label_prefix_marks_non_interactive_modes() {
        assert_eq!(TurnMode::Interactive.label("hi"), "hi");
        assert_eq!(TurnMode::Scheduled.label("hi"), "[scheduled task] hi");
        assert_eq!(TurnMode::Governance.label("hi"), "[governance] hi");
    }

    #[tokio::test]
    async fn test_echo_agent_drains_to_done() {
        let agent = EchoAgent;
        let request = AgentTurnRequest {
            prompt: "hello".to_string(),
            session_id: Some(SessionId::new("s1")),
            mode: TurnMode::Interactive,
        };
        let mut stream = agent.run_turn(request).await;

        let first = stream.next().await.unwrap();
        assert_eq!(first.status, AgentStatus::Running);

        let second = stream.next().await.unwrap();
        assert_eq!(second.status, AgentStatus::Done);
        assert_eq!(second.result.as_deref(), Some("echo: hello"));
        assert_eq!(second.session_id, Some(SessionId::new("s1")));

        assert!(stream.next().await.is_none());
    }
}

//! Request/response correlation and the agent-facing task envelope
//! (spec.md §4.C).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::error::{IpcError, IpcResult};
use crate::layout::GroupIpcPaths;
use crate::writer::write_json_atomic;

/// The operation family an agent→host task request names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpcTaskKind {
    /// Schedule or reschedule a task.
    Schedule,
    /// Cancel a previously scheduled task.
    Cancel,
    /// Register a new capability or webhook.
    Register,
    /// A Trello integration call.
    Trello,
    /// A Slack integration call.
    Slack,
    /// A memory broker call (`mem_store`/`mem_recall`).
    Memory,
    /// An arbitrary outbound external-service call.
    ExternalCall,
}

/// One agent→host request read from `tasks/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcTask {
    /// Correlates this request to its eventual `responses/<request_id>.json`.
    pub request_id: String,
    /// The requested operation family.
    pub kind: IpcTaskKind,
    /// Whether the requesting agent session carries the `isMain` capability.
    pub is_main: bool,
    /// Operation-specific payload.
    pub payload: serde_json::Value,
}

impl IpcTask {
    /// Parse a task request from the bytes of a `tasks/` file.
    pub fn from_slice(bytes: &[u8]) -> IpcResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Write the host's reply to a correlated task request, atomically.
pub async fn respond(paths: &GroupIpcPaths, request_id: &str, body: &serde_json::Value) -> IpcResult<()> {
    write_json_atomic(&paths.response_path(request_id), body).await
}

/// Poll for `responses/<request_id>.json` until it appears or `timeout`
/// elapses, then read and unlink it. Mirrors the agent side's own
/// poll-then-unlink read so either side of the transport can use this
/// helper in tests.
pub async fn await_response(
    paths: &GroupIpcPaths,
    request_id: &str,
    poll_interval: Duration,
    timeout: Duration,
) -> IpcResult<serde_json::Value> {
    let path = paths.response_path(request_id);
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if let Ok(bytes) = fs::read(&path).await {
            let value: serde_json::Value = serde_json::from_slice(&bytes)?;
            let _ = fs::remove_file(&path).await;
            return Ok(value);
        }

        if tokio::time::Instant::now() >= deadline {
            debug!(request_id, "timed out waiting for IPC response");
            return Err(IpcError::Timeout);
        }
        tokio::time::sleep(poll_interval.min(deadline - tokio::time::Instant::now())).await;
    }
}

/// Validate the `isMain` capability gate: non-main sessions may not
/// issue operations restricted to the main group.
pub fn require_main(task: &IpcTask, operation: &str) -> IpcResult<()> {
    if task.is_main {
        Ok(())
    } else {
        Err(IpcError::Unauthorized(format!(
            "{operation} requires the isMain capability"
        )))
    }
}

/// Validate that a task's payload carries `field`, returning the
/// standard `BAD_REQUEST` error when it is absent.
pub fn require_field<'a>(task: &'a IpcTask, field: &str) -> IpcResult<&'a serde_json::Value> {
    task.payload
        .get(field)
        .ok_or_else(|| IpcError::BadRequest(format!("missing required field `{field}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(kind: IpcTaskKind, is_main: bool, payload: serde_json::Value) -> IpcTask {
        IpcTask {
            request_id: "req-1".to_string(),
            kind,
            is_main,
            payload,
        }
    }

    #[tokio::test]
    async fn test_respond_then_await_response_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = GroupIpcPaths::new(tmp.path(), "acme-co");
        paths.ensure_dirs().await.unwrap();

        respond(&paths, "req-1", &json!({"ok": true})).await.unwrap();

        let value = await_response(
            &paths,
            "req-1",
            Duration::from_millis(10),
            Duration::from_millis(200),
        )
        .await
        .unwrap();

        assert_eq!(value, json!({"ok": true}));
        assert!(!paths.response_path("req-1").exists());
    }

    #[tokio::test]
    async fn test_await_response_times_out_when_never_written() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = GroupIpcPaths::new(tmp.path(), "acme-co");
        paths.ensure_dirs().await.unwrap();

        let result = await_response(
            &paths,
            "req-missing",
            Duration::from_millis(10),
            Duration::from_millis(30),
        )
        .await;

        assert!(matches!(result, Err(IpcError::Timeout)));
    }

    #[test]
    fn test_require_main_rejects_non_main_session() {
        let task = task(IpcTaskKind::Register, false, json!({}));
        let result = require_main(&task, "register");
        assert!(matches!(result, Err(IpcError::Unauthorized(_))));
    }

    #[test]
    fn test_require_field_rejects_missing_field() {
        let task = task(IpcTaskKind::Schedule, true, json!({"prompt": "hi"}));
        let result = require_field(&task, "schedule_value");
        assert!(matches!(result, Err(IpcError::BadRequest(_))));
    }

    #[test]
    fn test_require_field_accepts_present_field() {
        let task = task(IpcTaskKind::Schedule, true, json!({"prompt": "hi"}));
        let result = require_field(&task, "prompt");
        assert!(result.is_ok());
    }

    #[test]
    fn test_task_kind_wire_names_are_snake_case() {
        let value = serde_json::to_value(IpcTaskKind::ExternalCall).unwrap();
        assert_eq!(value, json!("external_call"));
    }
}

//! Handler table (spec.md §9 redesign flag): replaces a `switch (data.type)`
//! over agent→host `tasks/` requests with a map from [`IpcTaskKind`] to a
//! registered handler capability. Each handler authorizes, validates, then
//! executes; [`process_file`] runs that pipeline for one `tasks/` file and
//! writes the correlated response (or quarantines the file on failure).
//!
//! Concrete handlers (schedule/cancel against `nanoclaw-scheduler`'s task
//! store, memory ops against `nanoclaw-memory`, external calls against the
//! limits engine) are registered by `nanoclaw-host`, which owns every
//! component a handler might need; this crate only defines the registry
//! shape and the generic file-processing pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tracing::warn;

use crate::broker::{IpcTask, IpcTaskKind};
use crate::error::IpcResult;
use crate::layout::GroupIpcPaths;
use crate::watcher::{quarantine, scan_sorted};
use crate::writer::write_json_atomic;

/// One registered capability for an [`IpcTaskKind`].
///
/// Implementations should keep `authorize` and `validate` cheap and
/// side-effect-free; only `execute` may touch storage or external
/// services.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Capability-gate the request (e.g. [`crate::broker::require_main`]).
    fn authorize(&self, task: &IpcTask) -> IpcResult<()>;
    /// Validate the request's payload shape, independent of authorization.
    fn validate(&self, task: &IpcTask) -> IpcResult<()>;
    /// Perform the operation and return the `data` payload for the
    /// correlated response.
    async fn execute(&self, group: &str, task: &IpcTask) -> IpcResult<serde_json::Value>;
}

/// Registry mapping [`IpcTaskKind`] to its registered [`TaskHandler`].
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<IpcTaskKind, Arc<dyn TaskHandler>>,
}

impl HandlerTable {
    /// Build an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` for `kind`, replacing any prior registration.
    pub fn register(&mut self, kind: IpcTaskKind, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// Look up the handler for `kind`, if any is registered.
    #[must_use]
    pub fn get(&self, kind: IpcTaskKind) -> Option<&Arc<dyn TaskHandler>> {
        self.handlers.get(&kind)
    }
}

/// The standard `{success, message, data?}` shape a processed task's
/// response is written as (spec.md §6).
fn success_response(data: serde_json::Value) -> serde_json::Value {
    serde_json::json!({"success": true, "message": "ok", "data": data})
}

fn error_response(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"success": false, "message": message, "data": {"code": code}})
}

/// Read one `tasks/` file, run its kind's handler, write the correlated
/// response, then remove the processed file. Files with no registered
/// handler, a parse failure, or a missing `request_id` are quarantined
/// rather than silently dropped (spec.md §4.C).
pub async fn process_file(table: &HandlerTable, paths: &GroupIpcPaths, group: &str, path: &std::path::Path) -> IpcResult<()> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(error) => return Err(error.into()),
    };

    let task = match IpcTask::from_slice(&bytes) {
        Ok(task) => task,
        Err(error) => {
            warn!(path = %path.display(), error = %error, "unparseable ipc task, quarantining");
            quarantine(path, &paths.errors_dir()).await?;
            return Ok(());
        }
    };

    let outcome = run_handler(table, group, &task).await;
    match outcome {
        Ok(data) => {
            write_json_atomic(&paths.response_path(&task.request_id), &success_response(data)).await?;
        }
        Err(error) => {
            write_json_atomic(
                &paths.response_path(&task.request_id),
                &error_response(error.as_wire_str(), &error.to_string()),
            )
            .await?;
        }
    }

    fs::remove_file(path).await?;
    Ok(())
}

async fn run_handler(table: &HandlerTable, group: &str, task: &IpcTask) -> IpcResult<serde_json::Value> {
    let Some(handler) = table.get(task.kind) else {
        return Err(crate::error::IpcError::BadRequest(format!(
            "no handler registered for {:?}",
            task.kind
        )));
    };
    handler.authorize(task)?;
    handler.validate(task)?;
    handler.execute(group, task).await
}

/// Process every pending file in `group`'s `tasks/` directory,
/// timestamp-ascending, stopping at whatever was present when the scan
/// started (new arrivals wait for the next poll).
pub async fn drain_tasks_once(table: &HandlerTable, paths: &GroupIpcPaths, group: &str) -> IpcResult<usize> {
    let files = scan_sorted(&paths.tasks_dir()).await?;
    let count = files.len();
    for file in files {
        if let Err(error) = process_file(table, paths, group, &file).await {
            warn!(path = %file.display(), error = %error, "failed to process ipc task, quarantining");
            let _ = quarantine(&file, &paths.errors_dir()).await;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TaskHandler for EchoHandler {
        fn authorize(&self, _task: &IpcTask) -> IpcResult<()> {
            Ok(())
        }
        fn validate(&self, task: &IpcTask) -> IpcResult<()> {
            crate::broker::require_field(task, "prompt").map(|_| ())
        }
        async fn execute(&self, _group: &str, task: &IpcTask) -> IpcResult<serde_json::Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"echo": task.payload["prompt"]}))
        }
    }

    struct DenyHandler;

    #[async_trait]
    impl TaskHandler for DenyHandler {
        fn authorize(&self, task: &IpcTask) -> IpcResult<()> {
            crate::broker::require_main(task, "register")
        }
        fn validate(&self, _task: &IpcTask) -> IpcResult<()> {
            Ok(())
        }
        async fn execute(&self, _group: &str, _task: &IpcTask) -> IpcResult<serde_json::Value> {
            Ok(json!({}))
        }
    }

    async fn write_task(paths: &GroupIpcPaths, request_id: &str, kind: IpcTaskKind, is_main: bool, payload: serde_json::Value) {
        let task = IpcTask {
            request_id: request_id.to_string(),
            kind,
            is_main,
            payload,
        };
        let name = crate::filename::generate(chrono::Utc::now());
        write_json_atomic(&paths.tasks_dir().join(name), &task).await.unwrap();
    }

    #[tokio::test]
    async fn test_drain_processes_and_responds() {
        let dir = tempfile::tempdir().unwrap();
        let paths = GroupIpcPaths::new(dir.path(), "acme");
        paths.ensure_dirs().await.unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let mut table = HandlerTable::new();
        table.register(IpcTaskKind::ExternalCall, Arc::new(EchoHandler { calls: calls.clone() }));

        write_task(&paths, "req-1", IpcTaskKind::ExternalCall, true, json!({"prompt": "hi"})).await;

        let processed = drain_tasks_once(&table, &paths, "acme").await.unwrap();
        assert_eq!(processed, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let response_bytes = fs::read(paths.response_path("req-1")).await.unwrap();
        let response: serde_json::Value = serde_json::from_slice(&response_bytes).unwrap();
        assert_eq!(response["success"], json!(true));
        assert_eq!(response["data"]["echo"], json!("hi"));
    }

    #[tokio::test]
    async fn test_missing_handler_writes_failure_response_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let paths = GroupIpcPaths::new(dir.path(), "acme");
        paths.ensure_dirs().await.unwrap();
        let table = HandlerTable::new();

        write_task(&paths, "req-2", IpcTaskKind::Trello, true, json!({})).await;
        drain_tasks_once(&table, &paths, "acme").await.unwrap();

        let response_bytes = fs::read(paths.response_path("req-2")).await.unwrap();
        let response: serde_json::Value = serde_json::from_slice(&response_bytes).unwrap();
        assert_eq!(response["success"], json!(false));
    }

    #[tokio::test]
    async fn test_unauthorized_handler_writes_denied_response() {
        let dir = tempfile::tempdir().unwrap();
        let paths = GroupIpcPaths::new(dir.path(), "acme");
        paths.ensure_dirs().await.unwrap();

        let mut table = HandlerTable::new();
        table.register(IpcTaskKind::Register, Arc::new(DenyHandler));

        write_task(&paths, "req-3", IpcTaskKind::Register, false, json!({})).await;
        drain_tasks_once(&table, &paths, "acme").await.unwrap();

        let response_bytes = fs::read(paths.response_path("req-3")).await.unwrap();
        let response: serde_json::Value = serde_json::from_slice(&response_bytes).unwrap();
        assert_eq!(response["success"], json!(false));
        assert_eq!(response["data"]["code"], json!("UNAUTHORIZED"));
    }

    #[tokio::test]
    async fn test_unparseable_file_is_quarantined_not_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let paths = GroupIpcPaths::new(dir.path(), "acme");
        paths.ensure_dirs().await.unwrap();
        let table = HandlerTable::new();

        let name = crate::filename::generate(chrono::Utc::now());
        let bad_path = paths.tasks_dir().join(name);
        fs::write(&bad_path, b"not json").await.unwrap();

        drain_tasks_once(&table, &paths, "acme").await.unwrap();

        assert!(!bad_path.exists());
        let errors = scan_sorted(&paths.errors_dir()).await.unwrap();
        assert_eq!(errors.len(), 1);
    }
}

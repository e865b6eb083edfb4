//! Per-group IPC loop: drains agent→host `tasks/`, drains agent→host
//! outbound `messages/`, and refreshes the `current_tasks.json`/
//! `gov_pipeline.json`/`ext_capabilities.json` snapshots a group's agent
//! reads (spec.md §4.C, §6).
//!
//! One instance of this loop runs per configured group, ticking
//! independently so a slow or wedged group never holds up another's IPC
//! traffic.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use nanoclaw_core::{ChatJid, CurrentTaskEntry, ExtCapabilities, GovPipelineSnapshot, GovState, GroupFolder};
use nanoclaw_ipc::{drain_tasks_once, quarantine, scan_sorted, write_current_tasks, write_ext_capabilities, write_gov_pipeline, GroupIpcPaths, HandlerTable};
use nanoclaw_router::{deliver_or_queue, flush_pending, ChannelDriver, OutboundQueue};
use nanoclaw_storage::{GovernanceRepository, Store, TaskRepository};
use serde::Deserialize;
use tokio::fs;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Everything a group's IPC loop needs, shared across every group's
/// instance of [`run_group_ipc_loop`].
pub struct GroupIpcDeps {
    /// Persistent store.
    pub store: Arc<Store>,
    /// Registered `tasks/` handlers.
    pub handler_table: Arc<HandlerTable>,
    /// Outbound channel driver.
    pub channel: Arc<dyn ChannelDriver>,
    /// Buffered outbound messages, shared with the router.
    pub outbound: OutboundQueue,
    /// Root directory containing every group's IPC subtree.
    pub ipc_root: PathBuf,
    /// The privileged group.
    pub main_group: GroupFolder,
    /// Whether external-provider calls are enabled, for `ext_capabilities.json`.
    pub ext_calls_enabled: bool,
    /// Whether embeddings calls are enabled, for `ext_capabilities.json`.
    pub embeddings_enabled: bool,
}

/// An agent→host outbound chat message dropped into `messages/`.
#[derive(Debug, Deserialize)]
struct OutboundMessage {
    chat_jid: String,
    text: String,
}

/// Run one group's IPC loop until `shutdown` fires, ticking every
/// `poll_interval`.
pub async fn run_group_ipc_loop(
    deps: Arc<GroupIpcDeps>,
    group: String,
    poll_interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let paths = GroupIpcPaths::new(&deps.ipc_root, &group);
    if let Err(error) = paths.ensure_dirs().await {
        warn!(%group, %error, "failed to create ipc directories");
        return;
    }

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => {
                info!(%group, "group ipc loop shutting down");
                return;
            }
            _ = ticker.tick() => {
                drain_messages(&deps, &paths, &group).await;
                if let Err(error) = drain_tasks_once(&deps.handler_table, &paths, &group).await {
                    warn!(%group, %error, "failed to drain ipc tasks");
                }
                if let Err(error) = write_snapshots(&deps, &paths, &group).await {
                    warn!(%group, %error, "failed to write ipc snapshots");
                }
            }
        }
    }
}

async fn drain_messages(deps: &GroupIpcDeps, paths: &GroupIpcPaths, group: &str) {
    let files = match scan_sorted(&paths.messages_dir()).await {
        Ok(files) => files,
        Err(error) => {
            warn!(%group, %error, "failed to scan messages directory");
            return;
        }
    };

    for file in files {
        let bytes = match fs::read(&file).await {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(path = %file.display(), %error, "failed to read outbound message");
                continue;
            }
        };
        let message: OutboundMessage = match serde_json::from_slice(&bytes) {
            Ok(message) => message,
            Err(error) => {
                warn!(path = %file.display(), %error, "unparseable outbound message, quarantining");
                let _ = quarantine(&file, &paths.errors_dir()).await;
                continue;
            }
        };

        let chat = ChatJid::new(message.chat_jid);
        deliver_or_queue(deps.channel.as_ref(), &deps.outbound, &chat, message.text).await;
        flush_pending(deps.channel.as_ref(), &deps.outbound, &chat).await;

        if let Err(error) = fs::remove_file(&file).await {
            warn!(path = %file.display(), %error, "failed to remove processed outbound message");
        }
    }
}

async fn write_snapshots(deps: &GroupIpcDeps, paths: &GroupIpcPaths, group: &str) -> nanoclaw_ipc::IpcResult<()> {
    let tasks = TaskRepository::new(&deps.store)
        .list_all()
        .await
        .map(|tasks| tasks.iter().map(CurrentTaskEntry::from).collect::<Vec<_>>())
        .unwrap_or_default();
    write_current_tasks(paths, &tasks).await?;

    let is_main = group == deps.main_group.as_str();
    let gov_tasks = GovernanceRepository::new(&deps.store)
        .list_filtered(None, None, None)
        .await
        .map(|tasks| {
            tasks
                .into_iter()
                .filter(|t| is_main || t.assigned_group.as_deref() == Some(group))
                .filter(|t| t.state != GovState::Done)
                .filter_map(|t| serde_json::to_value(t).ok())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    write_gov_pipeline(
        paths,
        &GovPipelineSnapshot {
            generated_at: chrono::Utc::now(),
            tasks: gov_tasks,
        },
    )
    .await?;

    // No external-provider registry exists in this configuration model
    // (spec.md §6 carries no provider-name list), so the providers set
    // is always empty rather than fabricated.
    write_ext_capabilities(
        paths,
        &ExtCapabilities {
            is_main,
            ext_calls_enabled: deps.ext_calls_enabled,
            embeddings_enabled: deps.embeddings_enabled,
            providers: Vec::new(),
        },
    )
    .await?;

    Ok(())
}

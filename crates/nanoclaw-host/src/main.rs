//! `nanoclawd` - the NanoClaw host daemon.
//!
//! Thin entry point: loads configuration, builds every component crate's
//! dependencies, and spawns the background loops (router, scheduler,
//! governance, worker health, nonce janitor, one IPC loop per group)
//! alongside the ops HTTP API, then waits for a shutdown signal.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod agent;
mod channel;
mod groups;
mod handlers;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nanoclaw_auth::JanitorConfig;
use nanoclaw_config::Config;
use nanoclaw_core::{EventBus, GroupFolder};
use nanoclaw_dispatch::{run_health_loop, DispatchConfig, HealthDeps, WorkerDispatcher, WorkerHttpClient};
use nanoclaw_governance::{run_governance_loop, GovernanceConfig, GovernanceDeps};
use nanoclaw_ipc::{HandlerTable, IpcTaskKind};
use nanoclaw_limits::LimitsConfig;
use nanoclaw_router::{AgentLock, ChannelDriver, OutboundQueue, RouterDeps, SessionMap, Trigger};
use nanoclaw_scheduler::{run_scheduler_loop, SchedulerDeps};
use nanoclaw_storage::{Database, Store};
use nanoclaw_telemetry::{setup_logging, LogConfig};
use tokio::sync::broadcast;
use tracing::info;

use crate::agent::UnavailableAgent;
use crate::channel::LoggingChannelDriver;
use crate::groups::{run_group_ipc_loop, GroupIpcDeps};
use crate::handlers::{CancelHandler, ExternalCallHandler, MemoryHandler, ScheduleHandler};

/// NanoClaw host daemon - orchestrates the router, scheduler, governance,
/// worker fleet, and IPC broker components over a shared store.
#[derive(Parser)]
#[command(name = "nanoclawd")]
#[command(author, version, about = "NanoClaw host daemon")]
struct Args {
    /// Path to a TOML configuration file. Defaults are used for any
    /// section a file (or the environment) doesn't override.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daemon (the default when no subcommand is given).
    Run,
    /// Load and validate configuration, print a summary, and exit.
    Status,
}

/// The operations the limits engine is configured for at startup. Each
/// name is what handlers and loops pass as `op` to
/// [`nanoclaw_limits::LimitsEngine::enforce`].
const LIMITS_OPS: &[&str] = &["agent_turn", "mem_store", "mem_recall", "ext_call", "worker_dispatch"];
/// Operations that talk to an upstream provider and so pick up the
/// shared circuit breaker.
const BREAKER_OPS: &[&str] = &["agent_turn", "ext_call"];

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    let log_config = LogConfig::new(level);
    if let Err(error) = setup_logging(&log_config) {
        eprintln!("failed to initialize logging: {error}");
    }

    let config = nanoclaw_config::load(args.config.as_deref()).context("loading configuration")?;

    match args.command.unwrap_or(Command::Run) {
        Command::Status => print_status(&config),
        Command::Run => run(config).await?,
    }

    Ok(())
}

fn print_status(config: &Config) {
    info!(
        groups = ?config.groups.all_groups(),
        ops_bind = %config.ops.bind_addr,
        worker_port = config.worker.port,
        data_dir = %config.storage.data_dir,
        "configuration loaded"
    );
    println!("nanoclawd configuration OK");
    println!("  groups:     {:?}", config.groups.all_groups());
    println!("  ops bind:   {}", config.ops.bind_addr);
    println!("  worker port:{}", config.worker.port);
    println!("  data dir:   {}", config.storage.data_dir);
}

async fn run(config: Config) -> Result<()> {
    let db = Database::connect_embedded(&format!("{}/db", config.storage.data_dir))
        .await
        .context("connecting to storage")?;
    let kv = Arc::new(nanoclaw_storage::SurrealKvStore::new(db.clone()));
    let store = Arc::new(Store::new(db, kv));

    let events = EventBus::new();
    let main_group = GroupFolder::new(config.groups.main_group.clone());

    let env_vars: HashMap<String, String> = std::env::vars().collect();
    let limits_config = Arc::new(LimitsConfig::from_env(&env_vars, LIMITS_OPS, BREAKER_OPS, config.limits.enabled));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let agent: Arc<dyn nanoclaw_router::AgentClient> = Arc::new(UnavailableAgent);
    let channel: Arc<dyn ChannelDriver> = Arc::new(LoggingChannelDriver);
    let outbound = OutboundQueue::new();
    let lock = AgentLock::new();

    let mut handles = Vec::new();

    let router_deps = Arc::new(RouterDeps {
        store: store.clone(),
        agent: agent.clone(),
        channel: channel.clone(),
        outbound: outbound.clone(),
        lock: lock.clone(),
        sessions: SessionMap::new(),
        events: Arc::new(events.clone()),
        trigger: Trigger::new(&config.router.assistant_name).context("building trigger matcher")?,
        assistant_name: config.router.assistant_name.clone(),
    });
    handles.push(tokio::spawn(nanoclaw_router::run_router_loop(
        router_deps,
        Duration::from_millis(config.router.poll_interval_ms),
        shutdown_tx.subscribe(),
    )));

    let scheduler_deps = Arc::new(SchedulerDeps {
        store: store.clone(),
        agent: agent.clone(),
        lock,
        timezone: config.scheduler.timezone.clone(),
        max_attempts: config.scheduler.max_attempts,
    });
    handles.push(tokio::spawn(run_scheduler_loop(
        scheduler_deps,
        Duration::from_millis(config.scheduler.poll_interval_ms),
        shutdown_tx.subscribe(),
    )));

    let worker_client = WorkerHttpClient::new(Duration::from_secs(30));
    let dispatcher = Arc::new(WorkerDispatcher::new(store.clone(), worker_client.clone()));
    let dispatch_config = DispatchConfig {
        health_interval: Duration::from_millis(config.worker.health_interval_ms),
        health_failure_threshold: config.worker.health_failure_threshold,
        request_timeout: Duration::from_secs(30),
    };
    let health_deps = Arc::new(HealthDeps {
        store: store.clone(),
        client: worker_client,
        events: events.clone(),
        config: dispatch_config,
    });
    handles.push(tokio::spawn(run_health_loop(health_deps, shutdown_tx.subscribe())));

    let governance_deps = Arc::new(GovernanceDeps {
        store: store.clone(),
        dispatcher: dispatcher.clone(),
        events: events.clone(),
        main_group: main_group.clone(),
        config: GovernanceConfig::default(),
    });
    handles.push(tokio::spawn(run_governance_loop(governance_deps, shutdown_tx.subscribe())));

    let janitor_store = (*store).clone();
    let janitor_config = JanitorConfig {
        interval: Duration::from_millis(config.worker.nonce_cleanup_interval_ms),
        retention: chrono::Duration::milliseconds(config.worker.nonce_ttl_ms),
        cap: config.worker.nonce_cap,
    };
    let janitor_handle = tokio::spawn(nanoclaw_auth::janitor::run(janitor_store, janitor_config));

    let mut handler_table = HandlerTable::new();
    handler_table.register(
        IpcTaskKind::Schedule,
        Arc::new(ScheduleHandler {
            store: store.clone(),
            timezone: config.scheduler.timezone.clone(),
        }),
    );
    handler_table.register(IpcTaskKind::Cancel, Arc::new(CancelHandler { store: store.clone() }));
    handler_table.register(
        IpcTaskKind::Memory,
        Arc::new(MemoryHandler {
            store: store.clone(),
            main_group: main_group.clone(),
        }),
    );
    handler_table.register(
        IpcTaskKind::ExternalCall,
        Arc::new(ExternalCallHandler {
            store: store.clone(),
            limits_config: limits_config.clone(),
        }),
    );
    let handler_table = Arc::new(handler_table);

    let ipc_root = PathBuf::from(format!("{}/ipc", config.storage.data_dir));
    let group_ipc_deps = Arc::new(GroupIpcDeps {
        store: store.clone(),
        handler_table,
        channel,
        outbound,
        ipc_root,
        main_group: main_group.clone(),
        ext_calls_enabled: config.limits.ext_calls_enabled,
        embeddings_enabled: config.limits.embeddings_enabled,
    });
    for group in config.groups.all_groups() {
        handles.push(tokio::spawn(run_group_ipc_loop(
            group_ipc_deps.clone(),
            group,
            Duration::from_millis(config.ipc.poll_interval_ms),
            shutdown_tx.subscribe(),
        )));
    }

    let ops_config = nanoclaw_ops::OpsConfig {
        http_secret: config.ops.http_secret.clone(),
        write_secret_current: config.ops.write_secret_current.clone(),
        write_secret_previous: config.ops.write_secret_previous.clone(),
        bind_addr: config.ops.bind_addr.clone(),
    };
    let bind_addr = ops_config.bind_addr.clone();
    let app_state = nanoclaw_ops::AppState {
        store: store.clone(),
        dispatcher,
        events,
        main_group,
        limits_config,
        ops_config: Arc::new(ops_config),
        worker_hmac_ttl_ms: config.worker.nonce_ttl_ms,
    };
    let router = nanoclaw_ops::router(app_state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding ops http server to {bind_addr}"))?;
    info!(%bind_addr, "nanoclawd ops api listening");

    let mut ops_shutdown = shutdown_tx.subscribe();
    let ops_handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = ops_shutdown.recv().await;
            })
            .await;
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c");
        }
    }

    info!("shutting down nanoclawd");
    let _ = shutdown_tx.send(());

    for handle in handles {
        let _ = handle.await;
    }
    let _ = ops_handle.await;
    janitor_handle.abort();

    info!("nanoclawd stopped");
    Ok(())
}

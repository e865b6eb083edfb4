//! Periodic snapshot file writes (spec.md §4.C): `current_tasks.json`,
//! `gov_pipeline.json`, `ext_capabilities.json`. Thin atomic-write wrappers
//! over [`nanoclaw_core::snapshot`]'s wire types, rooted at a group's IPC
//! directory via [`GroupIpcPaths`].

use nanoclaw_core::{CurrentTasksSnapshot, ExtCapabilities, GovPipelineSnapshot};

use crate::error::IpcResult;
use crate::layout::GroupIpcPaths;
use crate::writer::write_json_atomic;

/// Write `current_tasks.json` for `group`.
pub async fn write_current_tasks(paths: &GroupIpcPaths, snapshot: &CurrentTasksSnapshot) -> IpcResult<()> {
    write_json_atomic(&paths.current_tasks_snapshot(), snapshot).await
}

/// Write `gov_pipeline.json` for `group`.
pub async fn write_gov_pipeline(paths: &GroupIpcPaths, snapshot: &GovPipelineSnapshot) -> IpcResult<()> {
    write_json_atomic(&paths.gov_pipeline_snapshot(), snapshot).await
}

/// Write `ext_capabilities.json` for `group`.
pub async fn write_ext_capabilities(paths: &GroupIpcPaths, snapshot: &ExtCapabilities) -> IpcResult<()> {
    write_json_atomic(&paths.ext_capabilities_snapshot(), snapshot).await
}

//! Host→agent follow-up messages during an open session (spec.md §4.C).

use serde::Serialize;

use crate::error::IpcResult;
use crate::filename::generate;
use crate::layout::GroupIpcPaths;
use crate::writer::{write_bytes_atomic, write_json_atomic};

/// Queue a follow-up chat message for an agent session that is currently
/// open, writing it into `input/` under a fresh `<ms>-<rand>.json` name.
pub async fn push_input<T: Serialize>(paths: &GroupIpcPaths, message: &T) -> IpcResult<()> {
    let name = generate(chrono::Utc::now());
    let path = paths.input_dir().join(name);
    write_json_atomic(&path, message).await
}

/// Write the `_close` terminate sentinel, signalling the agent session
/// to shut down after draining any remaining `input/` files.
pub async fn push_close(paths: &GroupIpcPaths) -> IpcResult<()> {
    write_bytes_atomic(&paths.close_sentinel_path(), b"").await
}

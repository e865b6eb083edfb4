//! Atomic tmp+rename file writes (spec.md §4.C write protocol).

use std::path::Path;

use tokio::fs;

use crate::error::IpcResult;

/// Serialize `value` and write it to `path` atomically: write to
/// `<path>.tmp`, then rename over `path`. Readers that ignore `*.tmp`
/// never observe a partially written file.
pub async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> IpcResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes_atomic(path, &bytes).await
}

/// Write raw bytes atomically via the same tmp+rename protocol.
pub async fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> IpcResult<()> {
    let tmp_path = tmp_path_for(path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&tmp_path, bytes).await?;
    fs::rename(&tmp_path, path).await?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::path::PathBuf::from(tmp)
}

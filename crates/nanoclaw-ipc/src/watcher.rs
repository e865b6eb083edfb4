//! Polling directory watcher (spec.md §4.C).
//!
//! The broker has no inotify dependency: it polls each watched directory
//! on a fixed interval and processes whatever `*.json` files it finds,
//! oldest-first. This keeps the transport dependency-free across the
//! host/worker boundary (the worker side may run in an environment
//! where inotify isn't available) at the cost of up to one poll
//! interval of latency.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::filename::timestamp_of;

/// List `*.json` files directly inside `dir`, sorted timestamp-ascending
/// by the leading `<ms>` component of their filename. Files that don't
/// match the `<ms>-<rand>.json` shape sort last, in filename order.
pub async fn scan_sorted(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(error),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let is_tmp = path.extension().is_some_and(|ext| ext == "tmp");
        if is_json && !is_tmp {
            files.push(path);
        }
    }

    files.sort_by_key(|path| {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        (timestamp_of(name).unwrap_or(i64::MAX), name.to_string())
    });
    Ok(files)
}

/// Move a file that failed to parse or handle into `errors_dir`, rather
/// than deleting it. A pre-existing file of the same name in
/// `errors_dir` is overwritten.
pub async fn quarantine(path: &Path, errors_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(errors_dir).await?;
    let Some(name) = path.file_name() else {
        return Ok(());
    };
    let destination = errors_dir.join(name);
    fs::rename(path, destination).await
}

//! Per-group IPC directory layout (spec.md §4.C).

use std::path::{Path, PathBuf};

/// Resolved paths for one group's IPC directory tree, rooted at
/// `<ipc_root>/<group_folder>/`.
#[derive(Debug, Clone)]
pub struct GroupIpcPaths {
    root: PathBuf,
}

impl GroupIpcPaths {
    /// Resolve the layout for `group_folder` under `ipc_root`.
    #[must_use]
    pub fn new(ipc_root: &Path, group_folder: &str) -> Self {
        Self {
            root: ipc_root.join(group_folder),
        }
    }

    /// The group's IPC root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `tasks/` — agent→host requests.
    #[must_use]
    pub fn tasks_dir(&self) -> PathBuf {
        self.root.join("tasks")
    }

    /// `messages/` — agent→host outbound chat messages.
    #[must_use]
    pub fn messages_dir(&self) -> PathBuf {
        self.root.join("messages")
    }

    /// `responses/` — host→agent responses, one file per `request_id`.
    #[must_use]
    pub fn responses_dir(&self) -> PathBuf {
        self.root.join("responses")
    }

    /// Path to the response file for a specific `request_id`.
    #[must_use]
    pub fn response_path(&self, request_id: &str) -> PathBuf {
        self.responses_dir().join(format!("{request_id}.json"))
    }

    /// `input/` — host→agent follow-up chat messages for an open session.
    #[must_use]
    pub fn input_dir(&self) -> PathBuf {
        self.root.join("input")
    }

    /// The terminate sentinel inside `input/`.
    #[must_use]
    pub fn close_sentinel_path(&self) -> PathBuf {
        self.input_dir().join("_close")
    }

    /// `errors/` — files that failed to parse or handle.
    #[must_use]
    pub fn errors_dir(&self) -> PathBuf {
        self.root.join("errors")
    }

    /// `current_tasks.json` snapshot path.
    #[must_use]
    pub fn current_tasks_snapshot(&self) -> PathBuf {
        self.root.join("current_tasks.json")
    }

    /// `gov_pipeline.json` snapshot path.
    #[must_use]
    pub fn gov_pipeline_snapshot(&self) -> PathBuf {
        self.root.join("gov_pipeline.json")
    }

    /// `ext_capabilities.json` snapshot path.
    #[must_use]
    pub fn ext_capabilities_snapshot(&self) -> PathBuf {
        self.root.join("ext_capabilities.json")
    }

    /// All directories that must exist before the broker starts watching
    /// this group.
    #[must_use]
    pub fn all_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.tasks_dir(),
            self.messages_dir(),
            self.responses_dir(),
            self.input_dir(),
            self.errors_dir(),
        ]
    }

    /// Create every directory in [`Self::all_dirs`], recursively.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in self.all_dirs() {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_rooted_under_group_folder() {
        let paths = GroupIpcPaths::new(Path::new("/var/nanoclaw/ipc"), "acme-co");
        assert_eq!(paths.root(), Path::new("/var/nanoclaw/ipc/acme-co"));
        assert_eq!(
            paths.response_path("req-42"),
            Path::new("/var/nanoclaw/ipc/acme-co/responses/req-42.json")
        );
        assert_eq!(
            paths.close_sentinel_path(),
            Path::new("/var/nanoclaw/ipc/acme-co/input/_close")
        );
    }

    #[tokio::test]
    async fn test_ensure_dirs_creates_every_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = GroupIpcPaths::new(tmp.path(), "acme-co");

        paths.ensure_dirs().await.unwrap();

        for dir in paths.all_dirs() {
            assert!(dir.is_dir());
        }
    }
}

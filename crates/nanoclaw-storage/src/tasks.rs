//! Task Scheduler repository.

use chrono::{DateTime, Utc};
use nanoclaw_core::{Task, TaskId};

use crate::error::StorageResult;
use crate::store::Store;

const TABLE: &str = "task";

/// Typed access to the `task` table.
pub struct TaskRepository<'a> {
    store: &'a Store,
}

impl<'a> TaskRepository<'a> {
    /// Build a repository over `store`.
    #[must_use]
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Insert or overwrite a task.
    pub async fn upsert(&self, task: &Task) -> StorageResult<()> {
        self.store.upsert(TABLE, &task.task_id.0, task).await
    }

    /// Load a task by id.
    pub async fn get(&self, task_id: &TaskId) -> StorageResult<Option<Task>> {
        self.store.get(TABLE, &task_id.0).await
    }

    /// Delete a task.
    pub async fn delete(&self, task_id: &TaskId) -> StorageResult<()> {
        self.store.delete(TABLE, &task_id.0).await
    }

    /// Load every active task whose `next_run` is at or before `now`, the
    /// scheduler tick's candidate set.
    pub async fn due_at(&self, now: DateTime<Utc>) -> StorageResult<Vec<Task>> {
        let mut response = self
            .store
            .db()
            .client()
            .query("SELECT * FROM task WHERE status = 'active' AND next_run <= $now")
            .bind(("now", now))
            .await
            .map_err(crate::error::StorageError::from)?;
        let tasks: Vec<Task> = response.take(0).map_err(crate::error::StorageError::from)?;
        Ok(tasks)
    }

    /// Load every task regardless of status, for the `current_tasks.json`
    /// IPC snapshot (spec.md §6).
    pub async fn list_all(&self) -> StorageResult<Vec<Task>> {
        let tasks: Vec<Task> = self
            .store
            .db()
            .client()
            .select(TABLE)
            .await
            .map_err(crate::error::StorageError::from)?;
        Ok(tasks)
    }
}

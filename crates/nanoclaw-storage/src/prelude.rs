//! Prelude module - commonly used types for convenient import.
//!
//! Use `use nanoclaw_storage::prelude::*;` to import all essential types.

pub use crate::{StorageError, StorageResult};

pub use crate::{Database, Store, Versioned};

pub use crate::{KvStore, MemoryKvStore, ScopedKvStore, SurrealKvStore};

pub use crate::{
    GovernanceRepository, LimitsRepository, MemoryRepository, MessageRepository, RouterRepository,
    TaskRepository, WorkerRepository,
};

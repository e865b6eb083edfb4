//! NanoClaw Storage - the persistent store component (spec.md §4.A).
//!
//! Two tiers, mirroring the teacher's storage crate:
//! - [`Database`] / [`store::Store`] — an embedded `SurrealDB` instance
//!   (`SurrealKV` engine), providing single-row upsert, read-by-key,
//!   conditional update-by-version (CAS), and unique-constraint
//!   insert-as-claim.
//! - [`kv::KvStore`] — a flat namespaced byte store backing append-only
//!   logs (`GovActivity`, `LimitDenial`, memory access log) and IPC
//!   snapshot blobs.
//!
//! Enable the `kv` feature for the namespaced byte store alone, `db` for
//! the relational tier alone, or `full` (the default) for both plus the
//! typed per-component repositories.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod db;
pub mod error;
pub mod governance;
pub mod kv;
pub mod limits;
pub mod memory;
pub mod messages;
pub mod products;
pub mod router;
pub mod store;
pub mod tasks;
pub mod workers;

pub use db::Database;
pub use error::{StorageError, StorageResult};
pub use governance::GovernanceRepository;
pub use kv::{KvStore, MemoryKvStore, ScopedKvStore, SurrealKvStore};
pub use limits::LimitsRepository;
pub use memory::MemoryRepository;
pub use messages::MessageRepository;
pub use products::ProductRepository;
pub use router::RouterRepository;
pub use store::{Store, Versioned};
pub use tasks::TaskRepository;
pub use workers::WorkerRepository;

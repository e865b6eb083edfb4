//! Memory data model (owned by the Memory Broker).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{GroupFolder, MemoryId, ProductId};

/// Sensitivity tier of a stored memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryLevel {
    /// Broadly visible.
    L1,
    /// Visible within scope/product boundaries.
    L2,
    /// Restricted to the main group.
    L3,
}

/// A stored memory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Unique identifier.
    pub id: MemoryId,
    /// The memory content itself.
    pub content: String,
    /// Hash of `content`, computed at store time.
    pub content_hash: String,
    /// Sensitivity tier.
    pub level: MemoryLevel,
    /// Tenancy scope this memory is visible within.
    pub scope: String,
    /// Product this memory is scoped to, if product-scoped.
    pub product_id: Option<ProductId>,
    /// Group folder that authored this memory.
    pub group_folder: GroupFolder,
    /// Free-form tags for recall matching.
    pub tags: Vec<String>,
    /// Whether the PII/injection heuristic scan flagged this content.
    /// Recorded for observability; never blocks the store.
    pub pii_detected: bool,
    /// When this memory was first stored.
    pub created_at: DateTime<Utc>,
    /// When this memory was last updated.
    pub updated_at: DateTime<Utc>,
    /// Monotonic optimistic-concurrency counter.
    pub version: u64,
}

/// Outcome of scanning memory content for PII or prompt-injection
/// indicators before storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentScan {
    /// Whether any PII-shaped substring was found.
    pub pii_detected: bool,
    /// Whether any prompt-injection indicator was found.
    pub injection_detected: bool,
    /// Human-readable notes about what was matched, for audit purposes.
    pub notes: Vec<String>,
}

/// An access-log entry recorded for every memory considered during a
/// `mem_recall`, whether returned or denied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryAccessLogEntry {
    /// The memory considered.
    pub memory_id: MemoryId,
    /// Group that performed the recall.
    pub requested_by: GroupFolder,
    /// Whether the memory was included in the result.
    pub returned: bool,
    /// Reason for denial, if not returned.
    pub denial_reason: Option<String>,
    /// When this access was recorded.
    pub created_at: DateTime<Utc>,
}

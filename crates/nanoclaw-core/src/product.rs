//! Product data model, consulted by the Governance Loop's product gating
//! (spec.md §4.G) and surfaced read-only by the Ops HTTP API
//! (`/ops/products[/:id]`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ProductId;

/// Operational status of a product under `GovScope::Product`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Dispatch into this product's `GovTask`s proceeds normally.
    Active,
    /// Dispatch is suppressed; `PRODUCT`-scoped tasks remain in their
    /// current state until the product is resumed.
    Paused,
}

/// A product a `GovTask` may be scoped to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier.
    pub id: ProductId,
    /// Human-readable name.
    pub name: String,
    /// Current operational status, consulted for dispatch gating.
    pub status: ProductStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

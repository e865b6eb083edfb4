//! Product repository, consulted by the Governance Loop's product gating
//! and surfaced read-only by the Ops HTTP API.

use nanoclaw_core::{Product, ProductId};

use crate::error::StorageResult;
use crate::store::Store;

const TABLE: &str = "product";

/// Typed access to the `product` table.
pub struct ProductRepository<'a> {
    store: &'a Store,
}

impl<'a> ProductRepository<'a> {
    /// Build a repository over `store`.
    #[must_use]
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Insert or overwrite a product.
    pub async fn upsert(&self, product: &Product) -> StorageResult<()> {
        self.store.upsert(TABLE, &product.id.0, product).await
    }

    /// Load a product by id.
    pub async fn get(&self, id: &ProductId) -> StorageResult<Option<Product>> {
        self.store.get(TABLE, &id.0).await
    }

    /// List every known product.
    pub async fn list(&self) -> StorageResult<Vec<Product>> {
        let products: Vec<Product> = self
            .store
            .db()
            .client()
            .select(TABLE)
            .await
            .map_err(crate::error::StorageError::from)?;
        Ok(products)
    }
}

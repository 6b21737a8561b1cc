//! Store abstraction
//!
//! Every operation reports failure through [`StoreError`]; nothing is
//! logged-and-swallowed.

use async_trait::async_trait;
use catalog_core::{NewProduct, Product, ProductId, ProductPatch, ValidationError};
use std::sync::Arc;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid product: {0}")]
    Validation(#[from] ValidationError),

    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("no product id left after {0}")]
    IdExhausted(ProductId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// CRUD over an ordered sequence of products
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Validates and appends a product, assigning the next id.
    async fn add(&self, product: NewProduct) -> Result<Product>;

    /// All products, in insertion order.
    async fn list(&self) -> Result<Vec<Product>>;

    async fn get_by_id(&self, id: ProductId) -> Result<Product>;

    /// Merges `patch` over the stored product and returns the result.
    async fn update(&self, id: ProductId, patch: ProductPatch) -> Result<Product>;

    /// Removes a product and returns it.
    async fn delete(&self, id: ProductId) -> Result<Product>;
}

/// Shared store reference
pub type SharedProductStore = Arc<dyn ProductStore>;

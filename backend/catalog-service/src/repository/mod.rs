//! Catalog data collaborators
//!
//! The lookup engine only reads through these traits. PostgreSQL backs them in
//! production; the in-memory implementation serves tests and local runs.

mod memory;
mod postgres;

pub use memory::InMemoryCatalog;
pub use postgres::{PgCategoryStore, PgInteractionAggregator, PgProductCatalog};

use crate::models::{CategoryRecord, InteractionCounts, ProductRow};
use anyhow::Result;
use std::collections::HashSet;

/// Source of the flat category table
#[async_trait::async_trait]
pub trait CategoryStore: Send + Sync {
    /// All category records, in a stable order
    async fn fetch_categories(&self) -> Result<Vec<CategoryRecord>>;
}

/// Source of product rows
#[async_trait::async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Products whose category id is one of `category_ids`
    async fn fetch_products_by_category_ids(
        &self,
        category_ids: &HashSet<String>,
    ) -> Result<Vec<ProductRow>>;
}

/// Source of per-item interaction volume
#[async_trait::async_trait]
pub trait InteractionAggregator: Send + Sync {
    /// Interaction counts for exactly `item_ids`; ids without events may be absent
    async fn fetch_interaction_counts(&self, item_ids: &HashSet<String>)
        -> Result<InteractionCounts>;
}

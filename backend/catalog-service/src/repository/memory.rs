use super::{CategoryStore, InteractionAggregator, ProductCatalog};
use crate::models::{CategoryRecord, InteractionCounts, InteractionType, ProductRow};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-process catalog implementing all three collaborators.
///
/// Keeps a little bookkeeping (fetch counts, last requested ids) so callers can
/// check how the lookup engine talks to its sources.
#[derive(Default)]
pub struct InMemoryCatalog {
    categories: RwLock<Vec<CategoryRecord>>,
    products: RwLock<Vec<ProductRow>>,
    interactions: RwLock<HashMap<String, Vec<InteractionType>>>,
    category_fetches: AtomicUsize,
    interaction_requests: RwLock<Vec<HashSet<String>>>,
}

impl InMemoryCatalog {
    pub fn new(categories: Vec<CategoryRecord>, products: Vec<ProductRow>) -> Self {
        Self {
            categories: RwLock::new(categories),
            products: RwLock::new(products),
            ..Default::default()
        }
    }

    pub async fn replace_categories(&self, categories: Vec<CategoryRecord>) {
        *self.categories.write().await = categories;
    }

    pub async fn add_product(&self, product: ProductRow) {
        self.products.write().await.push(product);
    }

    pub async fn record_interaction(&self, item_id: &str, kind: InteractionType) {
        self.interactions
            .write()
            .await
            .entry(item_id.to_string())
            .or_default()
            .push(kind);
    }

    /// Record `count` events of one kind
    pub async fn record_interactions(&self, item_id: &str, kind: InteractionType, count: usize) {
        let mut interactions = self.interactions.write().await;
        let events = interactions.entry(item_id.to_string()).or_default();
        events.extend(std::iter::repeat(kind).take(count));
    }

    /// How many times the category table has been read
    pub fn category_fetches(&self) -> usize {
        self.category_fetches.load(Ordering::SeqCst)
    }

    /// Id sets passed to `fetch_interaction_counts`, oldest first
    pub async fn interaction_requests(&self) -> Vec<HashSet<String>> {
        self.interaction_requests.read().await.clone()
    }
}

#[async_trait::async_trait]
impl CategoryStore for InMemoryCatalog {
    async fn fetch_categories(&self) -> Result<Vec<CategoryRecord>> {
        self.category_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.categories.read().await.clone())
    }
}

#[async_trait::async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn fetch_products_by_category_ids(
        &self,
        category_ids: &HashSet<String>,
    ) -> Result<Vec<ProductRow>> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .filter(|p| category_ids.contains(&p.category_id))
            .cloned()
            .map(ProductRow::sanitized)
            .collect())
    }
}

#[async_trait::async_trait]
impl InteractionAggregator for InMemoryCatalog {
    async fn fetch_interaction_counts(
        &self,
        item_ids: &HashSet<String>,
    ) -> Result<InteractionCounts> {
        self.interaction_requests
            .write()
            .await
            .push(item_ids.clone());

        let interactions = self.interactions.read().await;
        Ok(item_ids
            .iter()
            .filter_map(|id| {
                interactions
                    .get(id)
                    .map(|events| (id.clone(), events.len() as u64))
            })
            .collect())
    }
}

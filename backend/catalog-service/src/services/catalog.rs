use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::CatalogConfig;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{CategoryNode, RankedProduct};
use crate::repository::{CategoryStore, InteractionAggregator, ProductCatalog};
use crate::services::hierarchy::{CategoryIndex, HierarchyError};
use crate::services::ranking::ProductRanker;
use crate::services::snapshot::{CategorySnapshot, SnapshotInfo};

/// Catalog lookups: category hierarchy queries and ranked top products.
///
/// Owns the category snapshot; all other data is fetched per request through the
/// collaborators.
pub struct CatalogService {
    categories: Arc<dyn CategoryStore>,
    products: Arc<dyn ProductCatalog>,
    interactions: Arc<dyn InteractionAggregator>,
    snapshot: CategorySnapshot,
    ranker: ProductRanker,
    default_limit: i64,
    max_tree_depth: usize,
}

impl CatalogService {
    pub fn new(
        categories: Arc<dyn CategoryStore>,
        products: Arc<dyn ProductCatalog>,
        interactions: Arc<dyn InteractionAggregator>,
        config: &CatalogConfig,
    ) -> Self {
        Self {
            categories,
            products,
            interactions,
            snapshot: CategorySnapshot::new(
                Duration::from_secs(config.snapshot_ttl_secs),
                config.integrity_policy,
            ),
            ranker: ProductRanker::new(config.missing_rating_policy, config.max_limit),
            default_limit: config.default_limit,
            max_tree_depth: config.max_tree_depth,
        }
    }

    pub fn default_limit(&self) -> i64 {
        self.default_limit
    }

    async fn index(&self) -> Result<Arc<CategoryIndex>> {
        self.snapshot.load(self.categories.as_ref()).await
    }

    /// Full category forest; refused when deeper than `max_tree_depth`
    pub async fn get_category_tree(&self) -> Result<Vec<CategoryNode>> {
        let index = self.index().await?;
        if index.depth() > self.max_tree_depth {
            warn!(
                depth = index.depth(),
                max_tree_depth = self.max_tree_depth,
                "Category tree too deep to serve"
            );
            return Err(HierarchyError::DepthExceeded {
                depth: index.depth(),
                max: self.max_tree_depth,
            }
            .into());
        }
        Ok(index.forest().to_vec())
    }

    /// Top-level categories, without subtrees
    pub async fn get_root_categories(&self) -> Result<Vec<CategoryNode>> {
        let index = self.index().await?;
        Ok(index.root_nodes())
    }

    /// Direct children of a category, without their subtrees
    pub async fn get_subcategories(&self, category_id: &str) -> Result<Vec<CategoryNode>> {
        let index = self.index().await?;
        Ok(index.subcategories(category_id)?)
    }

    /// Top `limit` products of a category, optionally including every descendant
    /// category, ranked by interaction volume then rating.
    pub async fn lookup_top_products(
        &self,
        category_id: &str,
        include_descendants: bool,
        limit: i64,
    ) -> Result<Vec<RankedProduct>> {
        let started = Instant::now();
        let result = self
            .lookup_inner(category_id, include_descendants, limit)
            .await;

        match &result {
            Ok(ranked) => {
                metrics::record_lookup("ok");
                debug!(
                    category_id,
                    include_descendants,
                    limit,
                    returned = ranked.len(),
                    "Top products lookup completed"
                );
            }
            Err(e) => {
                metrics::record_lookup(e.kind());
                match e {
                    AppError::NotFound(_) | AppError::Validation(_) => {
                        debug!(category_id, error = %e, "Top products lookup rejected");
                    }
                    _ => warn!(category_id, error = %e, "Top products lookup failed"),
                }
            }
        }
        metrics::record_lookup_duration(include_descendants, started.elapsed());

        result
    }

    async fn lookup_inner(
        &self,
        category_id: &str,
        include_descendants: bool,
        limit: i64,
    ) -> Result<Vec<RankedProduct>> {
        let limit = self.ranker.validate_limit(limit)?;

        let index = self.index().await?;
        index.ensure_available(category_id)?;

        let filter: HashSet<String> = if include_descendants {
            index.closure(category_id)?
        } else {
            HashSet::from([category_id.to_string()])
        };

        let rows = self
            .products
            .fetch_products_by_category_ids(&filter)
            .await
            .map_err(|e| AppError::Database(format!("{:#}", e)))?;
        let candidates = self.ranker.select_candidates(&filter, rows);

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let item_ids: HashSet<String> = candidates.iter().map(|p| p.item_id.clone()).collect();
        let counts = self
            .interactions
            .fetch_interaction_counts(&item_ids)
            .await
            .map_err(|e| AppError::Database(format!("{:#}", e)))?;

        Ok(self.ranker.rank(&filter, candidates, &counts, limit)?)
    }

    /// Drop the cached category snapshot
    pub async fn invalidate_categories(&self) {
        self.snapshot.invalidate().await;
    }

    /// Load the category snapshot ahead of the first request
    pub async fn warm_up(&self) -> Result<()> {
        let index = self.index().await?;
        info!(categories = index.len(), "Category snapshot warmed up");
        Ok(())
    }

    pub async fn snapshot_info(&self) -> Option<SnapshotInfo> {
        self.snapshot.info().await
    }
}

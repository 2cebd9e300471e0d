use super::{CategoryStore, InteractionAggregator, ProductCatalog};
use crate::models::{CategoryRecord, InteractionCounts, ProductRow};
use anyhow::{Context, Result};
use sqlx::PgPool;
use std::collections::HashSet;
use tracing::{debug, warn};

// Id filters cast the bound array, never the column
const PRODUCTS_BY_CATEGORY_SQL: &str = r#"
    SELECT
        p.item_id::text AS item_id,
        p.name,
        p.category_id::text AS category_id,
        cat.name AS category_name,
        p.description,
        p.img_link,
        p.product_link,
        p.actual_price::float8 AS actual_price,
        p.discounted_price::float8 AS discounted_price,
        p.discount_percentage::float8 AS discount_percentage,
        p.avg_rating::float8 AS avg_rating,
        p.num_ratings::int4 AS num_ratings
    FROM products p
    JOIN category cat ON p.category_id = cat.category_id
    WHERE p.category_id = ANY($1::text[])
    ORDER BY p.item_id
"#;

const COUNT_INTERACTIONS_SQL: &str = r#"
    SELECT item_id::text, COUNT(*)::int8
    FROM stream_interaction
    WHERE item_id = ANY($1::text[])
    GROUP BY item_id
"#;

/// Reads the `category` table
#[derive(Clone)]
pub struct PgCategoryStore {
    pool: PgPool,
}

impl PgCategoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Health check
    pub async fn health_check(&self) -> Result<bool> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("PostgreSQL health check failed")?;
        Ok(true)
    }
}

#[async_trait::async_trait]
impl CategoryStore for PgCategoryStore {
    async fn fetch_categories(&self) -> Result<Vec<CategoryRecord>> {
        let rows = sqlx::query_as::<_, (String, String, Option<String>)>(
            r#"
            SELECT category_id::text, name, parent_id::text
            FROM category
            ORDER BY category_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch categories")?;

        debug!("Fetched {} category records", rows.len());

        Ok(rows
            .into_iter()
            .map(|(category_id, name, parent_id)| CategoryRecord {
                category_id,
                name,
                parent_id,
            })
            .collect())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRecord {
    item_id: String,
    name: String,
    category_id: String,
    category_name: String,
    description: Option<String>,
    img_link: Option<String>,
    product_link: Option<String>,
    actual_price: f64,
    discounted_price: Option<f64>,
    discount_percentage: Option<f64>,
    avg_rating: Option<f64>,
    num_ratings: Option<i32>,
}

impl From<ProductRecord> for ProductRow {
    fn from(record: ProductRecord) -> Self {
        let rating_count = record.num_ratings.and_then(|n| {
            u32::try_from(n)
                .map_err(|_| {
                    warn!(item_id = %record.item_id, num_ratings = n, "Negative rating count");
                })
                .ok()
        });

        ProductRow {
            item_id: record.item_id,
            name: record.name,
            category_id: record.category_id,
            category_name: record.category_name,
            description: record.description,
            img_link: record.img_link,
            product_link: record.product_link,
            actual_price: record.actual_price,
            discounted_price: record.discounted_price,
            discount_percentage: record.discount_percentage,
            rating: record.avg_rating,
            rating_count,
        }
        .sanitized()
    }
}

/// Reads the `products` table joined with category names
#[derive(Clone)]
pub struct PgProductCatalog {
    pool: PgPool,
}

impl PgProductCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProductCatalog for PgProductCatalog {
    async fn fetch_products_by_category_ids(
        &self,
        category_ids: &HashSet<String>,
    ) -> Result<Vec<ProductRow>> {
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = category_ids.iter().cloned().collect();

        let rows = sqlx::query_as::<_, ProductRecord>(PRODUCTS_BY_CATEGORY_SQL)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch products by category")?;

        debug!(
            "Fetched {} products across {} categories",
            rows.len(),
            ids.len()
        );

        Ok(rows.into_iter().map(ProductRow::from).collect())
    }
}

/// Counts `stream_interaction` events per item, on demand for the requested ids.
/// Every event counts once, whatever its interaction type.
#[derive(Clone)]
pub struct PgInteractionAggregator {
    pool: PgPool,
}

impl PgInteractionAggregator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl InteractionAggregator for PgInteractionAggregator {
    async fn fetch_interaction_counts(
        &self,
        item_ids: &HashSet<String>,
    ) -> Result<InteractionCounts> {
        if item_ids.is_empty() {
            return Ok(InteractionCounts::new());
        }
        let ids: Vec<String> = item_ids.iter().cloned().collect();

        let rows = sqlx::query_as::<_, (String, i64)>(COUNT_INTERACTIONS_SQL)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .context("Failed to aggregate interaction counts")?;

        Ok(rows
            .into_iter()
            .map(|(item_id, count)| (item_id, u64::try_from(count).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_filters_leave_columns_uncast() {
        assert!(PRODUCTS_BY_CATEGORY_SQL.contains("p.category_id = ANY($1::text[])"));
        assert!(COUNT_INTERACTIONS_SQL.contains("item_id = ANY($1::text[])"));
        assert!(!PRODUCTS_BY_CATEGORY_SQL.contains("category_id::text = ANY"));
        assert!(!COUNT_INTERACTIONS_SQL.contains("item_id::text = ANY"));
    }

    #[test]
    fn test_interaction_count_covers_every_event_type() {
        assert!(COUNT_INTERACTIONS_SQL.contains("COUNT(*)"));
        assert!(!COUNT_INTERACTIONS_SQL.contains("interaction_type"));
        assert!(!COUNT_INTERACTIONS_SQL.contains("$2"));
    }
}

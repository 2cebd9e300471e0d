/// Category API Handlers
///
/// HTTP endpoints for category browsing and ranked top products
use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::services::CatalogService;

/// Query parameters for GET /api/v1/categories/{category_id}/top-products
#[derive(Debug, Deserialize)]
pub struct TopProductsQuery {
    /// Page size (1..=max_limit); the service default applies when absent
    pub limit: Option<i64>,

    /// Include products of every descendant category
    #[serde(default = "default_include_subcategories")]
    pub include_subcategories: bool,
}

fn default_include_subcategories() -> bool {
    true
}

/// GET /api/v1/categories
///
/// Full category hierarchy
#[get("/api/v1/categories")]
pub async fn get_categories(service: web::Data<CatalogService>) -> Result<HttpResponse> {
    let tree = service.get_category_tree().await?;
    Ok(HttpResponse::Ok().json(tree))
}

/// GET /api/v1/categories/roots
///
/// Top-level categories only, with empty subcategories
#[get("/api/v1/categories/roots")]
pub async fn get_root_categories(service: web::Data<CatalogService>) -> Result<HttpResponse> {
    let roots = service.get_root_categories().await?;
    Ok(HttpResponse::Ok().json(roots))
}

/// GET /api/v1/categories/{category_id}/subcategories
#[get("/api/v1/categories/{category_id}/subcategories")]
pub async fn get_subcategories(
    path: web::Path<String>,
    service: web::Data<CatalogService>,
) -> Result<HttpResponse> {
    let category_id = path.into_inner();
    let subcategories = service.get_subcategories(&category_id).await?;
    Ok(HttpResponse::Ok().json(subcategories))
}

/// GET /api/v1/categories/{category_id}/top-products
///
/// Top products ranked by interaction count, then rating
#[get("/api/v1/categories/{category_id}/top-products")]
pub async fn get_top_products(
    path: web::Path<String>,
    query: web::Query<TopProductsQuery>,
    service: web::Data<CatalogService>,
) -> Result<HttpResponse> {
    let category_id = path.into_inner();
    let limit = query.limit.unwrap_or_else(|| service.default_limit());

    debug!(
        "Top products request: category={}, include_subcategories={}, limit={}",
        category_id, query.include_subcategories, limit
    );

    let products = service
        .lookup_top_products(&category_id, query.include_subcategories, limit)
        .await?;
    Ok(HttpResponse::Ok().json(products))
}

/// POST /api/v1/categories/cache/invalidate
///
/// Forces the next request to rebuild the category snapshot
#[post("/api/v1/categories/cache/invalidate")]
pub async fn invalidate_categories(service: web::Data<CatalogService>) -> HttpResponse {
    service.invalidate_categories().await;
    HttpResponse::NoContent().finish()
}

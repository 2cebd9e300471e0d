/// Health check handlers
use actix_web::{get, web, HttpResponse};
use serde_json::json;
use tracing::warn;

use crate::repository::PgCategoryStore;
use crate::services::CatalogService;

/// GET /health
///
/// Liveness check
#[get("/health")]
pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

/// GET /health/ready
///
/// Readiness check: database reachable, plus the current snapshot summary
#[get("/health/ready")]
pub async fn readiness(
    store: web::Data<PgCategoryStore>,
    service: web::Data<CatalogService>,
) -> HttpResponse {
    let snapshot = service.snapshot_info().await;

    match store.health_check().await {
        Ok(_) => HttpResponse::Ok().json(json!({
            "status": "ready",
            "database": "ok",
            "snapshot": snapshot,
        })),
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Readiness check failed");
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "unavailable",
                "database": "unreachable",
                "snapshot": snapshot,
            }))
        }
    }
}

pub mod categories;
pub mod health;

pub use categories::{
    get_categories, get_root_categories, get_subcategories, get_top_products,
    invalidate_categories, TopProductsQuery,
};
pub use health::{liveness, readiness};

use actix_web::web;

use crate::error::AppError;

/// Register the category API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Malformed query strings get the same JSON error body as other 400s
    cfg.app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    );

    cfg.service(get_categories)
        .service(get_root_categories)
        .service(invalidate_categories)
        .service(get_subcategories)
        .service(get_top_products);
}

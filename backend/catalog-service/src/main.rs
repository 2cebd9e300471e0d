use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_service::config::Config;
use catalog_service::handlers;
use catalog_service::jobs::start_category_invalidation_listener;
use catalog_service::metrics;
use catalog_service::repository::{PgCategoryStore, PgInteractionAggregator, PgProductCatalog};
use catalog_service::services::CatalogService;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_thread_ids(true)
                .with_target(true),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    info!(
        env = %config.app.env,
        port = config.app.http_port,
        snapshot_ttl_secs = config.catalog.snapshot_ttl_secs,
        missing_rating_policy = ?config.catalog.missing_rating_policy,
        integrity_policy = ?config.catalog.integrity_policy,
        "Starting catalog-service"
    );

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect(&config.database.url)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Database error: {}", e)))?;

    info!("Database connection pool initialized");

    let category_store = Arc::new(PgCategoryStore::new(db_pool.clone()));
    let service = Arc::new(CatalogService::new(
        category_store.clone(),
        Arc::new(PgProductCatalog::new(db_pool.clone())),
        Arc::new(PgInteractionAggregator::new(db_pool)),
        &config.catalog,
    ));

    // A broken hierarchy should not keep the server from starting
    if let Err(e) = service.warm_up().await {
        warn!(error = %e, "Category snapshot warm-up failed, will retry on first request");
    }

    let invalidation_handle = match config.redis.clone() {
        Some(redis_config) => {
            info!(
                channel = %redis_config.invalidation_channel,
                "Starting category invalidation listener"
            );
            Some(tokio::spawn(start_category_invalidation_listener(
                redis_config,
                service.clone(),
            )))
        }
        None => {
            info!("REDIS_URL not set, category invalidation listener disabled");
            None
        }
    };

    let service_data = web::Data::from(service);
    let store_data = web::Data::from(category_store);
    let bind_addr = format!("{}:{}", config.app.host, config.app.http_port);

    info!("Starting HTTP server on {}", bind_addr);

    let result = HttpServer::new(move || {
        App::new()
            .wrap(tracing_actix_web::TracingLogger::default())
            .app_data(service_data.clone())
            .app_data(store_data.clone())
            .service(handlers::liveness)
            .service(handlers::readiness)
            .route("/metrics", web::get().to(metrics::metrics_handler))
            .configure(handlers::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await;

    if let Some(handle) = invalidation_handle {
        handle.abort();
    }

    result
}

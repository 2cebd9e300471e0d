/// Configuration management for Catalog Service
///
/// Loads configuration from environment variables.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{IntegrityPolicy, MissingRatingPolicy};
use crate::services::ranking::MAX_LIMIT;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Redis configuration (cache invalidation); disabled when unset
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    /// Lookup engine settings
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// HTTP port
    pub http_port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Min connections in pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Connection acquire timeout
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL (redis://host:port)
    pub url: String,
    /// Pub/Sub channel carrying invalidation messages
    #[serde(default = "default_invalidation_channel")]
    pub invalidation_channel: String,
}

/// Lookup engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Limit used when a request does not pass one
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    /// Largest accepted limit
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// Category snapshot lifetime; 0 rebuilds on every request
    #[serde(default = "default_snapshot_ttl_secs")]
    pub snapshot_ttl_secs: u64,
    /// Deepest category tree the full-tree endpoint will serialize
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
    #[serde(default)]
    pub missing_rating_policy: MissingRatingPolicy,
    #[serde(default)]
    pub integrity_policy: IntegrityPolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            snapshot_ttl_secs: default_snapshot_ttl_secs(),
            max_tree_depth: default_max_tree_depth(),
            missing_rating_policy: MissingRatingPolicy::default(),
            integrity_policy: IntegrityPolicy::default(),
        }
    }
}

// Default values
fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

fn default_invalidation_channel() -> String {
    "cache:invalidate".to_string()
}

fn default_limit() -> i64 {
    10
}

fn default_max_limit() -> usize {
    MAX_LIMIT
}

fn default_snapshot_ttl_secs() -> u64 {
    60
}

fn default_max_tree_depth() -> usize {
    512
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8015), // catalog-service default HTTP port
        };

        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL environment variable not set")?,
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_max_connections),
            min_connections: std::env::var("DB_MIN_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_min_connections),
            acquire_timeout_secs: std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_acquire_timeout_secs),
        };

        let redis = std::env::var("REDIS_URL").ok().map(|url| RedisConfig {
            url,
            invalidation_channel: std::env::var("CACHE_INVALIDATION_CHANNEL")
                .unwrap_or_else(|_| default_invalidation_channel()),
        });

        let catalog = CatalogConfig {
            default_limit: std::env::var("CATALOG_DEFAULT_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_limit),
            max_limit: std::env::var("CATALOG_MAX_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_max_limit),
            snapshot_ttl_secs: std::env::var("CATALOG_SNAPSHOT_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_snapshot_ttl_secs),
            max_tree_depth: std::env::var("CATALOG_MAX_TREE_DEPTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_max_tree_depth),
            missing_rating_policy: match std::env::var("CATALOG_MISSING_RATING_POLICY") {
                Ok(value) => value.parse().map_err(|e: String| anyhow!(e))?,
                Err(_) => MissingRatingPolicy::default(),
            },
            integrity_policy: match std::env::var("CATALOG_INTEGRITY_POLICY") {
                Ok(value) => value.parse().map_err(|e: String| anyhow!(e))?,
                Err(_) => IntegrityPolicy::default(),
            },
        };
        catalog.validate()?;

        Ok(Config {
            app,
            database,
            redis,
            catalog,
        })
    }
}

impl CatalogConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_tree_depth == 0 {
            return Err(anyhow!("CATALOG_MAX_TREE_DEPTH must be at least 1"));
        }
        if self.max_limit == 0 {
            return Err(anyhow!("CATALOG_MAX_LIMIT must be at least 1"));
        }
        let max = i64::try_from(self.max_limit).unwrap_or(i64::MAX);
        if !(1..=max).contains(&self.default_limit) {
            return Err(anyhow!(
                "CATALOG_DEFAULT_LIMIT must be between 1 and {}",
                self.max_limit
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        std::env::set_var("DATABASE_URL", "postgres://test");

        let config = Config::from_env().unwrap();

        assert_eq!(config.app.env, "development");
        assert_eq!(config.app.host, "0.0.0.0");
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.catalog.default_limit, 10);
        assert_eq!(config.catalog.max_limit, 100);
        assert_eq!(config.catalog.max_tree_depth, 512);
        assert_eq!(
            config.catalog.missing_rating_policy,
            MissingRatingPolicy::Lowest
        );
        assert_eq!(config.catalog.integrity_policy, IntegrityPolicy::Isolate);
    }

    #[test]
    fn test_catalog_config_validation() {
        let mut catalog = CatalogConfig::default();
        assert!(catalog.validate().is_ok());

        catalog.default_limit = 500;
        assert!(catalog.validate().is_err());

        catalog.default_limit = 10;
        catalog.max_limit = 0;
        assert!(catalog.validate().is_err());

        catalog.max_limit = 100;
        catalog.max_tree_depth = 0;
        assert!(catalog.validate().is_err());
    }
}

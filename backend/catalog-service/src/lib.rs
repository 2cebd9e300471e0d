//! Catalog Service Library
//!
//! Category hierarchy browsing and ranked top-product lookups.
//!
//! # Modules
//!
//! - `services::hierarchy`: cycle-checked tree building and subtree closure
//! - `services::ranking`: interaction/rating ordering of products
//! - `services::snapshot`: shared, atomically swapped category index
//! - `services::catalog`: lookup orchestration over the repositories
//! - `handlers`: HTTP API

pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod repository;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

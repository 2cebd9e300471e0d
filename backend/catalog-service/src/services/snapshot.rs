//! Process-wide category snapshot
//!
//! The built `CategoryIndex` is shared as an `Arc` and replaced wholesale on
//! rebuild: readers either see the previous index or the new one, never a
//! partially built one. A single refresh lock keeps rebuilds single-writer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::IntegrityPolicy;
use crate::repository::CategoryStore;
use crate::services::hierarchy::{CategoryIndex, CategoryTreeBuilder};

struct Snapshot {
    index: Arc<CategoryIndex>,
    loaded_at: Instant,
    built_at: DateTime<Utc>,
}

/// Summary of the cached snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    pub categories: usize,
    pub quarantined: usize,
    pub built_at: DateTime<Utc>,
}

pub struct CategorySnapshot {
    current: RwLock<Option<Snapshot>>,
    refresh: Mutex<()>,
    epoch: AtomicU64,
    ttl: Duration,
    policy: IntegrityPolicy,
}

impl CategorySnapshot {
    /// `ttl` of zero disables caching: every call rebuilds.
    pub fn new(ttl: Duration, policy: IntegrityPolicy) -> Self {
        Self {
            current: RwLock::new(None),
            refresh: Mutex::new(()),
            epoch: AtomicU64::new(0),
            ttl,
            policy,
        }
    }

    /// Current index, rebuilding from `store` when missing or expired
    pub async fn load(&self, store: &dyn CategoryStore) -> Result<Arc<CategoryIndex>> {
        if let Some(index) = self.fresh().await {
            return Ok(index);
        }

        let _guard = self.refresh.lock().await;
        // Another request may have rebuilt while we waited
        if let Some(index) = self.fresh().await {
            return Ok(index);
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let index = Arc::new(self.rebuild(store).await?);

        if self.epoch.load(Ordering::SeqCst) == epoch {
            *self.current.write().await = Some(Snapshot {
                index: Arc::clone(&index),
                loaded_at: Instant::now(),
                built_at: Utc::now(),
            });
        } else {
            debug!("Category snapshot invalidated during rebuild, not caching it");
        }

        Ok(index)
    }

    /// Drop the cached index; the next `load` rebuilds
    pub async fn invalidate(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *self.current.write().await = None;
        info!("Category snapshot invalidated");
    }

    pub async fn info(&self) -> Option<SnapshotInfo> {
        self.current.read().await.as_ref().map(|s| SnapshotInfo {
            categories: s.index.len(),
            quarantined: s.index.quarantined_count(),
            built_at: s.built_at,
        })
    }

    async fn fresh(&self) -> Option<Arc<CategoryIndex>> {
        if self.ttl.is_zero() {
            return None;
        }
        self.current
            .read()
            .await
            .as_ref()
            .filter(|s| s.loaded_at.elapsed() < self.ttl)
            .map(|s| Arc::clone(&s.index))
    }

    async fn rebuild(&self, store: &dyn CategoryStore) -> Result<CategoryIndex> {
        let started = Instant::now();
        let records = store
            .fetch_categories()
            .await
            .map_err(|e| AppError::Database(format!("{:#}", e)))?;

        let (index, issues) = CategoryTreeBuilder::build_with_policy(&records, self.policy)
            .map_err(|e| {
                error!(
                    error = %e,
                    records = records.len(),
                    "Category hierarchy build failed"
                );
                metrics::record_integrity_issue(e.kind());
                AppError::from(e)
            })?;

        for issue in &issues {
            warn!(
                kind = issue.kind(),
                category_id = issue.category_id(),
                issue = ?issue,
                "Pruned category branch with integrity issue"
            );
            metrics::record_integrity_issue(issue.kind());
        }

        metrics::record_snapshot_rebuild(index.len());
        info!(
            categories = index.len(),
            roots = index.forest().len(),
            quarantined = index.quarantined_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Category snapshot rebuilt"
        );

        Ok(index)
    }
}

/// Ranking Module
///
/// Orders the candidate products of a category filter by observed interaction
/// volume, with average rating as the tie-break.
///
/// # Workflow
/// 1. Keep the catalog rows whose category is in the filter set
/// 2. Attach the interaction count of each candidate (absent = 0)
/// 3. Stable sort by (interaction_count desc, rating desc)
/// 4. Truncate to the requested limit
pub mod ranker;

pub use ranker::ProductRanker;

use thiserror::Error;

/// Largest page the top-products query accepts
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankingError {
    #[error("limit must be between 1 and {max}, got {limit}")]
    InvalidLimit { limit: i64, max: usize },
}

pub type Result<T> = std::result::Result<T, RankingError>;

pub mod catalog;
pub mod hierarchy;
pub mod ranking;
pub mod snapshot;

pub use catalog::CatalogService;
pub use hierarchy::{CategoryIndex, CategoryTreeBuilder, SubtreeClosureResolver};
pub use ranking::ProductRanker;
pub use snapshot::CategorySnapshot;

//! Background jobs

pub mod category_invalidation;

pub use category_invalidation::start_category_invalidation_listener;

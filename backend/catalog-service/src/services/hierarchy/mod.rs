/// Category Hierarchy Module
///
/// Rebuilds the category forest from flat parent-pointer records and answers
/// subtree-closure queries over it.
///
/// # Architecture
/// - **Builder**: groups records into a children-index and materializes the forest
///   with an explicit work-stack (no recursion, cycle-checked)
/// - **Closure**: breadth-first descendant collection over the children-index
///
/// Both are pure functions of an immutable snapshot; the resulting `CategoryIndex`
/// is shared read-only between requests.
pub mod builder;
pub mod closure;

pub use builder::{CategoryIndex, CategoryTreeBuilder};
pub use closure::SubtreeClosureResolver;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("Category not found: {0}")]
    NotFound(String),

    #[error("Category {category_id} references missing parent {parent_id}")]
    DanglingParent {
        category_id: String,
        parent_id: String,
    },

    #[error("Category {category_id} is part of a parent cycle: {}", .path.join(" -> "))]
    Cycle {
        category_id: String,
        path: Vec<String>,
    },

    #[error("Duplicate category id: {0}")]
    DuplicateId(String),

    #[error("Category {category_id} was pruned from the hierarchy: {reason}")]
    Quarantined { category_id: String, reason: String },

    #[error("Category tree depth {depth} exceeds the servable maximum of {max}")]
    DepthExceeded { depth: usize, max: usize },
}

impl HierarchyError {
    pub fn kind(&self) -> &'static str {
        match self {
            HierarchyError::NotFound(_) => "not_found",
            HierarchyError::DanglingParent { .. } => "dangling_parent",
            HierarchyError::Cycle { .. } => "cycle",
            HierarchyError::DuplicateId(_) => "duplicate_id",
            HierarchyError::Quarantined { .. } => "quarantined",
            HierarchyError::DepthExceeded { .. } => "depth_exceeded",
        }
    }

    /// True for corrupted-data conditions, as opposed to a missing id
    pub fn is_integrity_error(&self) -> bool {
        !matches!(self, HierarchyError::NotFound(_))
    }
}

/// Integrity problem found while building, reported instead of aborting when the
/// builder isolates damage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    DanglingParent {
        category_id: String,
        parent_id: String,
    },
    Cycle {
        category_id: String,
        path: Vec<String>,
    },
    DuplicateId {
        category_id: String,
    },
}

impl IntegrityIssue {
    pub fn kind(&self) -> &'static str {
        match self {
            IntegrityIssue::DanglingParent { .. } => "dangling_parent",
            IntegrityIssue::Cycle { .. } => "cycle",
            IntegrityIssue::DuplicateId { .. } => "duplicate_id",
        }
    }

    /// Record the issue was detected on
    pub fn category_id(&self) -> &str {
        match self {
            IntegrityIssue::DanglingParent { category_id, .. }
            | IntegrityIssue::Cycle { category_id, .. }
            | IntegrityIssue::DuplicateId { category_id } => category_id,
        }
    }
}

impl From<IntegrityIssue> for HierarchyError {
    fn from(issue: IntegrityIssue) -> Self {
        match issue {
            IntegrityIssue::DanglingParent {
                category_id,
                parent_id,
            } => HierarchyError::DanglingParent {
                category_id,
                parent_id,
            },
            IntegrityIssue::Cycle { category_id, path } => {
                HierarchyError::Cycle { category_id, path }
            }
            IntegrityIssue::DuplicateId { category_id } => HierarchyError::DuplicateId(category_id),
        }
    }
}

pub type Result<T> = std::result::Result<T, HierarchyError>;

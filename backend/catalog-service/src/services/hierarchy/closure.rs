use super::{CategoryIndex, Result};
use std::collections::{HashSet, VecDeque};

/// Collects a category and all of its transitive descendants.
pub struct SubtreeClosureResolver;

impl SubtreeClosureResolver {
    /// Breadth-first walk over the children-index.
    ///
    /// An id enters `visited` before its children are queued, so each id is
    /// expanded at most once even if the index were corrupted into a cycle.
    pub fn resolve(index: &CategoryIndex, root: &str) -> Result<HashSet<String>> {
        index.ensure_available(root)?;

        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        visited.insert(root.to_string());
        queue.push_back(root);

        while let Some(current) = queue.pop_front() {
            for child in index.children_of(current) {
                if visited.insert(child.clone()) {
                    queue.push_back(child.as_str());
                }
            }
        }

        Ok(visited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryRecord;
    use crate::services::hierarchy::{CategoryTreeBuilder, HierarchyError};

    fn index() -> CategoryIndex {
        let records = vec![
            CategoryRecord::new("electronics", "Electronics", None),
            CategoryRecord::new("phones", "Phones", Some("electronics")),
            CategoryRecord::new("android", "Android", Some("phones")),
            CategoryRecord::new("ios", "iOS", Some("phones")),
            CategoryRecord::new("laptops", "Laptops", Some("electronics")),
            CategoryRecord::new("books", "Books", None),
        ];
        CategoryTreeBuilder::build(&records).unwrap()
    }

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_closure_includes_root_and_descendants() {
        let index = index();

        let closure = SubtreeClosureResolver::resolve(&index, "electronics").unwrap();
        assert_eq!(
            closure,
            set(&["electronics", "phones", "android", "ios", "laptops"])
        );

        let closure = SubtreeClosureResolver::resolve(&index, "phones").unwrap();
        assert_eq!(closure, set(&["phones", "android", "ios"]));
    }

    #[test]
    fn test_leaf_closure_is_itself() {
        let index = index();

        assert_eq!(
            SubtreeClosureResolver::resolve(&index, "android").unwrap(),
            set(&["android"])
        );
        assert_eq!(
            SubtreeClosureResolver::resolve(&index, "books").unwrap(),
            set(&["books"])
        );
    }

    #[test]
    fn test_unknown_root_is_not_found() {
        let index = index();

        let err = SubtreeClosureResolver::resolve(&index, "garden").unwrap_err();
        assert_eq!(err, HierarchyError::NotFound("garden".to_string()));
    }

    #[test]
    fn test_quarantined_root_is_integrity_error() {
        let records = vec![
            CategoryRecord::new("root", "Root", None),
            CategoryRecord::new("lost", "Lost", Some("missing")),
        ];
        let (index, _) = CategoryTreeBuilder::build_isolated(&records);

        let err = SubtreeClosureResolver::resolve(&index, "lost").unwrap_err();
        assert!(err.is_integrity_error());
    }
}

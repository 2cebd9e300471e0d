use super::{HierarchyError, IntegrityIssue, Result, SubtreeClosureResolver};
use crate::models::{CategoryNode, CategoryRecord, IntegrityPolicy};
use std::collections::{HashMap, HashSet};

/// Immutable, fully built view of the category table.
///
/// Holds the `id -> record` map (which doubles as the `id -> parent_id` side
/// index), the `parent_id -> child ids` index in input order, and the
/// materialized forest. Ids pruned by an isolating build are kept apart with the
/// issue that caused them, so lookups can tell "never existed" from "damaged".
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    records: HashMap<String, CategoryRecord>,
    children: HashMap<String, Vec<String>>,
    roots: Vec<String>,
    forest: Vec<CategoryNode>,
    quarantined: HashMap<String, IntegrityIssue>,
    depth: usize,
}

impl CategoryIndex {
    pub fn get(&self, category_id: &str) -> Option<&CategoryRecord> {
        self.records.get(category_id)
    }

    pub fn contains(&self, category_id: &str) -> bool {
        self.records.contains_key(category_id)
    }

    pub fn parent_of(&self, category_id: &str) -> Option<&str> {
        self.records
            .get(category_id)
            .and_then(|record| record.parent_id.as_deref())
    }

    /// Direct child ids in input order
    pub fn children_of(&self, category_id: &str) -> &[String] {
        self.children
            .get(category_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn forest(&self) -> &[CategoryNode] {
        &self.forest
    }

    /// Top-level categories without their subtrees
    pub fn root_nodes(&self) -> Vec<CategoryNode> {
        self.roots
            .iter()
            .filter_map(|id| self.records.get(id))
            .map(CategoryNode::shallow)
            .collect()
    }

    /// Direct children of a category, each without its subtree
    pub fn subcategories(&self, category_id: &str) -> Result<Vec<CategoryNode>> {
        self.ensure_available(category_id)?;
        Ok(self
            .children_of(category_id)
            .iter()
            .filter_map(|id| self.records.get(id))
            .map(CategoryNode::shallow)
            .collect())
    }

    /// Closure of `category_id`: the category plus every transitive descendant
    pub fn closure(&self, category_id: &str) -> Result<HashSet<String>> {
        SubtreeClosureResolver::resolve(self, category_id)
    }

    pub fn quarantine_reason(&self, category_id: &str) -> Option<&IntegrityIssue> {
        self.quarantined.get(category_id)
    }

    pub fn quarantined_count(&self) -> usize {
        self.quarantined.len()
    }

    /// Levels in the deepest branch of the forest; 0 when empty
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Resolves an id that a caller wants to query.
    ///
    /// Pruned ids surface as integrity errors, unknown ids as `NotFound`.
    pub fn ensure_available(&self, category_id: &str) -> Result<&CategoryRecord> {
        if let Some(record) = self.records.get(category_id) {
            return Ok(record);
        }
        match self.quarantined.get(category_id) {
            Some(issue) => Err(HierarchyError::Quarantined {
                category_id: category_id.to_string(),
                reason: HierarchyError::from(issue.clone()).to_string(),
            }),
            None => Err(HierarchyError::NotFound(category_id.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Rebuilds the category forest from flat parent-pointer records.
pub struct CategoryTreeBuilder;

impl CategoryTreeBuilder {
    /// Strict build: the first integrity violation fails the whole build.
    pub fn build(records: &[CategoryRecord]) -> Result<CategoryIndex> {
        let mut state = BuildState::new(records, true)?;
        state.run()?;
        Ok(state.finish().0)
    }

    /// Isolating build: offending records and their subtrees are pruned and
    /// reported, the remaining forest is complete and valid.
    pub fn build_isolated(records: &[CategoryRecord]) -> (CategoryIndex, Vec<IntegrityIssue>) {
        // Never fails in non-strict mode; every violation is recorded instead.
        let mut state = match BuildState::new(records, false) {
            Ok(state) => state,
            Err(_) => return (CategoryIndex::default(), Vec::new()),
        };
        if state.run().is_err() {
            return (CategoryIndex::default(), state.issues);
        }
        state.finish()
    }

    pub fn build_with_policy(
        records: &[CategoryRecord],
        policy: IntegrityPolicy,
    ) -> Result<(CategoryIndex, Vec<IntegrityIssue>)> {
        match policy {
            IntegrityPolicy::Strict => Self::build(records).map(|index| (index, Vec::new())),
            IntegrityPolicy::Isolate => Ok(Self::build_isolated(records)),
        }
    }
}

struct Frame<'a> {
    record: &'a CategoryRecord,
    next_child: usize,
    children: Vec<CategoryNode>,
}

impl<'a> Frame<'a> {
    fn new(record: &'a CategoryRecord) -> Self {
        Self {
            record,
            next_child: 0,
            children: Vec::new(),
        }
    }
}

struct BuildState<'a> {
    strict: bool,
    order: Vec<&'a CategoryRecord>,
    records: HashMap<&'a str, &'a CategoryRecord>,
    children: HashMap<&'a str, Vec<&'a CategoryRecord>>,
    roots: Vec<&'a CategoryRecord>,
    placed: HashSet<&'a str>,
    forest: Vec<CategoryNode>,
    quarantined: HashMap<&'a str, IntegrityIssue>,
    issues: Vec<IntegrityIssue>,
    depth: usize,
}

impl<'a> BuildState<'a> {
    /// Single pass: dedupe ids and group records by parent.
    fn new(input: &'a [CategoryRecord], strict: bool) -> Result<Self> {
        let mut state = Self {
            strict,
            order: Vec::with_capacity(input.len()),
            records: HashMap::with_capacity(input.len()),
            children: HashMap::new(),
            roots: Vec::new(),
            placed: HashSet::with_capacity(input.len()),
            forest: Vec::new(),
            quarantined: HashMap::new(),
            issues: Vec::new(),
            depth: 0,
        };

        for record in input {
            let id = record.category_id.as_str();
            if state.records.contains_key(id) {
                state.report(IntegrityIssue::DuplicateId {
                    category_id: id.to_string(),
                })?;
                continue;
            }
            state.records.insert(id, record);
            state.order.push(record);
            match record.parent_id.as_deref() {
                Some(parent) => state.children.entry(parent).or_default().push(record),
                None => state.roots.push(record),
            }
        }

        Ok(state)
    }

    fn report(&mut self, issue: IntegrityIssue) -> Result<()> {
        if self.strict {
            return Err(issue.into());
        }
        self.issues.push(issue);
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let roots = self.roots.clone();
        for root in roots {
            if let Some(tree) = self.materialize(root)? {
                self.forest.push(tree);
            }
        }
        self.classify_unplaced()
    }

    /// Depth-first materialization with an explicit stack. `on_path` holds the
    /// ids currently being expanded.
    fn materialize(&mut self, root: &'a CategoryRecord) -> Result<Option<CategoryNode>> {
        let mut on_path: HashSet<&'a str> = HashSet::new();
        let mut stack = vec![Frame::new(root)];
        let mut finished = None;

        on_path.insert(root.category_id.as_str());
        self.placed.insert(root.category_id.as_str());
        self.depth = self.depth.max(1);

        while let Some(frame) = stack.last_mut() {
            let next = self
                .children
                .get(frame.record.category_id.as_str())
                .and_then(|kids| kids.get(frame.next_child))
                .copied();

            match next {
                Some(child) => {
                    frame.next_child += 1;
                    let child_id = child.category_id.as_str();

                    if on_path.contains(child_id) || self.placed.contains(child_id) {
                        let mut path: Vec<String> = stack
                            .iter()
                            .map(|f| f.record.category_id.clone())
                            .collect();
                        path.push(child_id.to_string());
                        let issue = IntegrityIssue::Cycle {
                            category_id: child_id.to_string(),
                            path,
                        };
                        self.quarantined.insert(child_id, issue.clone());
                        self.report(issue)?;
                        continue;
                    }

                    on_path.insert(child_id);
                    self.placed.insert(child_id);
                    stack.push(Frame::new(child));
                    self.depth = self.depth.max(stack.len());
                }
                None => {
                    if let Some(done) = stack.pop() {
                        on_path.remove(done.record.category_id.as_str());
                        let node = CategoryNode {
                            id: done.record.category_id.clone(),
                            name: done.record.name.clone(),
                            parent_id: done.record.parent_id.clone(),
                            children: done.children,
                        };
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(node),
                            None => finished = Some(node),
                        }
                    }
                }
            }
        }

        Ok(finished)
    }

    /// Every record not reached from a root sits below a missing parent or on /
    /// below a parent cycle. Walk its parent chain to find out which.
    fn classify_unplaced(&mut self) -> Result<()> {
        let order = self.order.clone();

        for record in order {
            let id = record.category_id.as_str();
            if self.placed.contains(id) || self.quarantined.contains_key(id) {
                continue;
            }

            let mut chain: Vec<&'a str> = vec![id];
            let mut on_chain: HashSet<&'a str> = HashSet::from([id]);
            let mut cursor = record.parent_id.as_deref();

            let (issue, is_new) = loop {
                let Some(parent) = cursor else {
                    break (None, false);
                };
                if let Some(known) = self.quarantined.get(parent) {
                    break (Some(known.clone()), false);
                }
                if !self.records.contains_key(parent) {
                    let category_id = chain.last().copied().unwrap_or(id).to_string();
                    let issue = IntegrityIssue::DanglingParent {
                        category_id,
                        parent_id: parent.to_string(),
                    };
                    break (Some(issue), true);
                }
                if on_chain.contains(parent) {
                    let start = chain.iter().position(|c| *c == parent).unwrap_or(0);
                    break (Some(cycle_issue(&chain[start..])), true);
                }
                if self.placed.contains(parent) {
                    break (None, false);
                }
                chain.push(parent);
                on_chain.insert(parent);
                cursor = self
                    .records
                    .get(parent)
                    .and_then(|r| r.parent_id.as_deref());
            };

            let Some(issue) = issue else {
                continue;
            };
            if is_new {
                self.report(issue.clone())?;
            }
            for member in chain {
                self.quarantined.insert(member, issue.clone());
            }
        }

        Ok(())
    }

    fn finish(self) -> (CategoryIndex, Vec<IntegrityIssue>) {
        let placed = &self.placed;

        let records: HashMap<String, CategoryRecord> = self
            .order
            .iter()
            .filter(|r| placed.contains(r.category_id.as_str()))
            .map(|r| (r.category_id.clone(), (*r).clone()))
            .collect();

        let children: HashMap<String, Vec<String>> = self
            .children
            .iter()
            .filter(|(parent, _)| placed.contains(*parent))
            .map(|(parent, kids)| {
                let ids = kids
                    .iter()
                    .filter(|k| placed.contains(k.category_id.as_str()))
                    .map(|k| k.category_id.clone())
                    .collect();
                (parent.to_string(), ids)
            })
            .collect();

        let roots = self
            .roots
            .iter()
            .map(|r| r.category_id.clone())
            .collect();

        let quarantined = self
            .quarantined
            .into_iter()
            .filter(|(id, _)| !placed.contains(id))
            .map(|(id, issue)| (id.to_string(), issue))
            .collect();

        let index = CategoryIndex {
            records,
            children,
            roots,
            forest: self.forest,
            quarantined,
            depth: self.depth,
        };
        (index, self.issues)
    }
}

/// Cycle issue keyed on the smallest member id so every member reports the same
/// cycle, path rotated to start (and end) there.
fn cycle_issue(members: &[&str]) -> IntegrityIssue {
    let start = members
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| **id)
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mut path: Vec<String> = members[start..]
        .iter()
        .chain(members[..start].iter())
        .map(|id| id.to_string())
        .collect();
    let anchor = path.first().cloned().unwrap_or_default();
    path.push(anchor.clone());

    IntegrityIssue::Cycle {
        category_id: anchor,
        path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, parent: Option<&str>) -> CategoryRecord {
        CategoryRecord::new(id, &format!("Category {}", id), parent)
    }

    fn child_ids(node: &CategoryNode) -> Vec<&str> {
        node.children.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_build_forest_preserves_input_order() {
        let records = vec![
            rec("electronics", None),
            rec("phones", Some("electronics")),
            rec("books", None),
            rec("laptops", Some("electronics")),
            rec("android", Some("phones")),
            rec("tablets", Some("electronics")),
        ];

        let index = CategoryTreeBuilder::build(&records).unwrap();
        let forest = index.forest();

        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].id, "electronics");
        assert_eq!(forest[1].id, "books");
        assert_eq!(child_ids(&forest[0]), vec!["phones", "laptops", "tablets"]);
        assert_eq!(child_ids(&forest[0].children[0]), vec!["android"]);
        assert_eq!(index.parent_of("android"), Some("phones"));
        assert_eq!(index.parent_of("books"), None);
        assert_eq!(index.depth(), 3);
    }

    #[test]
    fn test_every_record_appears_exactly_once() {
        let records = vec![
            rec("a", None),
            rec("b", Some("a")),
            rec("c", Some("a")),
            rec("d", Some("b")),
            rec("e", None),
            rec("f", Some("e")),
            rec("g", Some("d")),
        ];

        let index = CategoryTreeBuilder::build(&records).unwrap();
        let mut seen = HashSet::new();
        let mut stack: Vec<&CategoryNode> = index.forest().iter().collect();
        while let Some(node) = stack.pop() {
            assert!(seen.insert(node.id.clone()), "{} placed twice", node.id);
            stack.extend(node.children.iter());
        }

        assert_eq!(seen.len(), records.len());
        assert_eq!(index.len(), records.len());
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let depth = 100_000;
        let mut records = vec![rec("n0", None)];
        for i in 1..depth {
            let parent = format!("n{}", i - 1);
            records.push(rec(&format!("n{}", i), Some(&parent)));
        }

        let index = CategoryTreeBuilder::build(&records).unwrap();
        assert_eq!(index.len(), depth);
        assert_eq!(index.forest().len(), 1);
        assert_eq!(index.closure("n99990").unwrap().len(), 10);
        assert_eq!(index.forest()[0].subtree_size(), depth);
        assert_eq!(index.depth(), depth);
    }

    #[test]
    fn test_two_node_cycle_is_rejected() {
        let records = vec![rec("a", Some("b")), rec("b", Some("a"))];

        let err = CategoryTreeBuilder::build(&records).unwrap_err();
        match err {
            HierarchyError::Cycle { category_id, path } => {
                assert_eq!(category_id, "a");
                assert_eq!(path, vec!["a", "b", "a"]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
        assert!(HierarchyError::DuplicateId("x".into()).is_integrity_error());
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let records = vec![rec("root", None), rec("loop", Some("loop"))];

        let err = CategoryTreeBuilder::build(&records).unwrap_err();
        assert!(matches!(err, HierarchyError::Cycle { ref category_id, .. } if category_id == "loop"));
    }

    #[test]
    fn test_dangling_parent_is_rejected_in_strict_mode() {
        let records = vec![rec("root", None), rec("orphan", Some("ghost"))];

        let err = CategoryTreeBuilder::build(&records).unwrap_err();
        assert_eq!(
            err,
            HierarchyError::DanglingParent {
                category_id: "orphan".to_string(),
                parent_id: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_id_is_rejected_in_strict_mode() {
        let records = vec![rec("root", None), rec("root", None)];

        let err = CategoryTreeBuilder::build(&records).unwrap_err();
        assert_eq!(err, HierarchyError::DuplicateId("root".to_string()));
    }

    #[test]
    fn test_isolated_build_prunes_damaged_branches() {
        let records = vec![
            rec("root", None),
            rec("child", Some("root")),
            rec("orphan", Some("ghost")),
            rec("orphan-kid", Some("orphan")),
            rec("x", Some("y")),
            rec("y", Some("x")),
            rec("under-cycle", Some("y")),
            rec("root", None),
        ];

        let (index, issues) = CategoryTreeBuilder::build_isolated(&records);

        assert_eq!(index.len(), 2);
        assert_eq!(index.forest().len(), 1);
        assert_eq!(child_ids(&index.forest()[0]), vec!["child"]);

        let kinds: Vec<&str> = issues.iter().map(|i| i.kind()).collect();
        assert_eq!(kinds, vec!["duplicate_id", "dangling_parent", "cycle"]);
        assert_eq!(issues[1].category_id(), "orphan");
        assert_eq!(issues[2].category_id(), "x");

        assert_eq!(index.quarantined_count(), 5);
        assert_eq!(
            index.quarantine_reason("orphan-kid").map(|i| i.kind()),
            Some("dangling_parent")
        );
        assert_eq!(
            index.quarantine_reason("under-cycle").map(|i| i.kind()),
            Some("cycle")
        );
        assert!(index.quarantine_reason("child").is_none());
        assert!(matches!(
            index.ensure_available("orphan-kid"),
            Err(HierarchyError::Quarantined { .. })
        ));
        assert!(matches!(
            index.ensure_available("under-cycle"),
            Err(HierarchyError::Quarantined { .. })
        ));
        assert_eq!(
            index.ensure_available("nope").unwrap_err(),
            HierarchyError::NotFound("nope".to_string())
        );
    }

    #[test]
    fn test_build_with_policy() {
        let records = vec![rec("a", None), rec("b", Some("missing"))];

        let (index, issues) =
            CategoryTreeBuilder::build_with_policy(&records, IntegrityPolicy::Isolate).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(issues.len(), 1);

        assert!(CategoryTreeBuilder::build_with_policy(&records, IntegrityPolicy::Strict).is_err());
    }

    #[test]
    fn test_roots_and_subcategories_are_shallow() {
        let records = vec![
            rec("electronics", None),
            rec("phones", Some("electronics")),
            rec("android", Some("phones")),
            rec("books", None),
        ];
        let index = CategoryTreeBuilder::build(&records).unwrap();

        let roots = index.root_nodes();
        assert_eq!(roots.len(), 2);
        assert!(roots.iter().all(|r| r.children.is_empty()));

        let subs = index.subcategories("electronics").unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].id, "phones");
        assert!(subs[0].children.is_empty());

        assert!(index.subcategories("books").unwrap().is_empty());
        assert!(index.subcategories("unknown").is_err());
    }

    #[test]
    fn test_empty_input_builds_empty_forest() {
        let index = CategoryTreeBuilder::build(&[]).unwrap();
        assert!(index.is_empty());
        assert!(index.forest().is_empty());
        assert_eq!(index.depth(), 0);
    }
}

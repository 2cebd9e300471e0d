use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Flat row from the `category` table
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRecord {
    pub category_id: String,
    pub name: String,
    pub parent_id: Option<String>,
}

impl CategoryRecord {
    pub fn new(category_id: &str, name: &str, parent_id: Option<&str>) -> Self {
        Self {
            category_id: category_id.to_string(),
            name: name.to_string(),
            parent_id: parent_id.map(str::to_string),
        }
    }
}

/// Node of the category forest. Children are owned; there is no parent pointer,
/// parent lookups go through `CategoryIndex::parent_of`.
///
/// `Clone`, `PartialEq` and `Drop` walk the subtree with an explicit stack, so
/// they are safe at any depth. Serialization recurses; callers bound the depth
/// first (see `CategoryIndex::depth`).
#[derive(Debug, Serialize)]
pub struct CategoryNode {
    #[serde(rename = "category_id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "subcategories")]
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Node without children (roots listing, direct subcategories)
    pub fn shallow(record: &CategoryRecord) -> Self {
        Self {
            id: record.category_id.clone(),
            name: record.name.clone(),
            parent_id: record.parent_id.clone(),
            children: Vec::new(),
        }
    }

    fn with_children(&self, children: Vec<CategoryNode>) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            parent_id: self.parent_id.clone(),
            children,
        }
    }

    /// Number of nodes in this subtree, including self
    pub fn subtree_size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

impl Clone for CategoryNode {
    fn clone(&self) -> Self {
        // Frames for nodes below `self`; clones of `self`'s children land in `top`
        let mut top: Vec<CategoryNode> = Vec::with_capacity(self.children.len());
        let mut stack: Vec<(&CategoryNode, Vec<CategoryNode>)> = Vec::new();

        loop {
            let (source, done) = match stack.last() {
                Some((source, cloned)) => (*source, cloned.len()),
                None => (self, top.len()),
            };

            match source.children.get(done) {
                Some(child) => stack.push((child, Vec::with_capacity(child.children.len()))),
                None => match stack.pop() {
                    Some((source, children)) => {
                        let node = source.with_children(children);
                        match stack.last_mut() {
                            Some((_, siblings)) => siblings.push(node),
                            None => top.push(node),
                        }
                    }
                    None => return self.with_children(top),
                },
            }
        }
    }
}

impl PartialEq for CategoryNode {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((a, b)) = pending.pop() {
            if a.id != b.id
                || a.name != b.name
                || a.parent_id != b.parent_id
                || a.children.len() != b.children.len()
            {
                return false;
            }
            pending.extend(a.children.iter().zip(b.children.iter()));
        }
        true
    }
}

// Deep hierarchies would overflow the stack with the default recursive drop.
impl Drop for CategoryNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Recorded engagement kinds in `stream_interaction`. Every event counts once
/// towards the interaction volume regardless of kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionType {
    PositiveView,
    NegativeView,
    Cart,
    Purchase,
    Rate,
}

/// Product snapshot as read from the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub item_id: String,
    pub name: String,
    pub category_id: String,
    pub category_name: String,
    pub description: Option<String>,
    pub img_link: Option<String>,
    pub product_link: Option<String>,
    pub actual_price: f64,
    pub discounted_price: Option<f64>,
    pub discount_percentage: Option<f64>,
    /// Average rating in [0, 5]; `None` when the product has no ratings yet
    pub rating: Option<f64>,
    pub rating_count: Option<u32>,
}

impl ProductRow {
    /// Minimal row, used by in-memory catalogs and tests
    pub fn new(item_id: &str, name: &str, category_id: &str, rating: Option<f64>) -> Self {
        Self {
            item_id: item_id.to_string(),
            name: name.to_string(),
            category_id: category_id.to_string(),
            category_name: category_id.to_string(),
            description: None,
            img_link: None,
            product_link: None,
            actual_price: 0.0,
            discounted_price: None,
            discount_percentage: None,
            rating,
            rating_count: None,
        }
    }

    /// Boundary validation: ratings outside [0, 5] (or NaN) are treated as absent.
    pub fn sanitized(mut self) -> Self {
        if let Some(rating) = self.rating {
            if !(0.0..=5.0).contains(&rating) {
                warn!(
                    item_id = %self.item_id,
                    rating,
                    "Discarding out-of-range product rating"
                );
                self.rating = None;
            }
        }
        self
    }
}

/// Per-item interaction volume. Absent ids have zero interactions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionCounts(HashMap<String, u64>);

impl InteractionCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, item_id: &str) -> u64 {
        self.0.get(item_id).copied().unwrap_or(0)
    }

    pub fn insert(&mut self, item_id: impl Into<String>, count: u64) {
        self.0.insert(item_id.into(), count);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, u64)> for InteractionCounts {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Product annotated with its interaction volume, in the response shape of the
/// top-products endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedProduct {
    pub item_id: String,
    pub product_name: String,
    pub category: String,
    #[serde(skip)]
    pub category_id: String,
    pub about_product: Option<String>,
    pub img_link: Option<String>,
    pub discount_percentage: Option<f64>,
    pub discounted_price: Option<f64>,
    pub actual_price: f64,
    pub product_link: Option<String>,
    pub rating_count: Option<u32>,
    pub rating: Option<f64>,
    pub interaction_count: u64,
}

impl RankedProduct {
    pub fn from_row(row: ProductRow, interaction_count: u64) -> Self {
        Self {
            item_id: row.item_id,
            product_name: row.name,
            category: row.category_name,
            category_id: row.category_id,
            about_product: row.description,
            img_link: row.img_link,
            discount_percentage: row.discount_percentage,
            discounted_price: row.discounted_price,
            actual_price: row.actual_price,
            product_link: row.product_link,
            rating_count: row.rating_count,
            rating: row.rating,
            interaction_count,
        }
    }
}

/// How products without any rating take part in ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingRatingPolicy {
    /// Rank below every rated product, including ones rated 0.0
    #[default]
    Lowest,
    /// Drop unrated products from the result
    Exclude,
}

impl std::str::FromStr for MissingRatingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lowest" => Ok(Self::Lowest),
            "exclude" => Ok(Self::Exclude),
            other => Err(format!("unknown missing rating policy: {}", other)),
        }
    }
}

/// What the tree builder does with dangling or cyclic records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityPolicy {
    /// Prune the offending records and their subtrees, keep the rest
    #[default]
    Isolate,
    /// Fail the whole build on the first violation
    Strict,
}

impl std::str::FromStr for IntegrityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "isolate" => Ok(Self::Isolate),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown integrity policy: {}", other)),
        }
    }
}

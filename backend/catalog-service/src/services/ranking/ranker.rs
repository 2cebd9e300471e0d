use super::{RankingError, Result, MAX_LIMIT};
use crate::models::{InteractionCounts, MissingRatingPolicy, ProductRow, RankedProduct};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Merges catalog rows with interaction counts into a bounded, best-first list.
///
/// Pure: all inputs are snapshots handed in by the caller.
#[derive(Debug, Clone, Copy)]
pub struct ProductRanker {
    missing_rating: MissingRatingPolicy,
    max_limit: usize,
}

impl Default for ProductRanker {
    fn default() -> Self {
        Self::new(MissingRatingPolicy::default(), MAX_LIMIT)
    }
}

impl ProductRanker {
    pub fn new(missing_rating: MissingRatingPolicy, max_limit: usize) -> Self {
        Self {
            missing_rating,
            max_limit: max_limit.max(1),
        }
    }

    /// Checks a caller-supplied limit against `[1, max_limit]`
    pub fn validate_limit(&self, limit: i64) -> Result<usize> {
        match usize::try_from(limit) {
            Ok(value) if (1..=self.max_limit).contains(&value) => Ok(value),
            _ => Err(RankingError::InvalidLimit {
                limit,
                max: self.max_limit,
            }),
        }
    }

    /// Candidate selection: rows belonging to a category of the filter set.
    ///
    /// Input order is kept; it is the final tie-break.
    pub fn select_candidates(
        &self,
        filter: &HashSet<String>,
        rows: Vec<ProductRow>,
    ) -> Vec<ProductRow> {
        rows.into_iter()
            .filter(|row| filter.contains(&row.category_id))
            .filter(|row| {
                self.missing_rating != MissingRatingPolicy::Exclude || row.rating.is_some()
            })
            .collect()
    }

    /// Ranks candidates and keeps the first `limit`.
    ///
    /// Returns `min(limit, candidates)` entries; an empty candidate set yields an
    /// empty result.
    pub fn rank(
        &self,
        filter: &HashSet<String>,
        rows: Vec<ProductRow>,
        counts: &InteractionCounts,
        limit: usize,
    ) -> Result<Vec<RankedProduct>> {
        let limit = self.validate_limit(i64::try_from(limit).unwrap_or(i64::MAX))?;

        let mut ranked: Vec<RankedProduct> = self
            .select_candidates(filter, rows)
            .into_iter()
            .map(|row| {
                let count = counts.get(&row.item_id);
                RankedProduct::from_row(row, count)
            })
            .collect();

        // sort_by is stable: full ties keep catalog order
        ranked.sort_by(compare_ranked);
        ranked.truncate(limit);

        Ok(ranked)
    }
}

fn compare_ranked(a: &RankedProduct, b: &RankedProduct) -> Ordering {
    b.interaction_count
        .cmp(&a.interaction_count)
        .then_with(|| compare_rating(b.rating, a.rating))
}

/// Absent ratings order below every present rating, 0.0 included.
fn compare_rating(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn counts(pairs: &[(&str, u64)]) -> InteractionCounts {
        pairs.iter().map(|(id, c)| (id.to_string(), *c)).collect()
    }

    fn ids(ranked: &[RankedProduct]) -> Vec<&str> {
        ranked.iter().map(|p| p.item_id.as_str()).collect()
    }

    #[test]
    fn test_rank_by_interactions_then_rating() {
        let ranker = ProductRanker::default();
        let rows = vec![
            ProductRow::new("p1", "Phone", "phones", Some(4.0)),
            ProductRow::new("p2", "Droid", "android", Some(4.8)),
            ProductRow::new("p3", "TV", "electronics", Some(3.0)),
            ProductRow::new("p4", "Cable", "electronics", Some(4.9)),
        ];
        let counts = counts(&[("p1", 10), ("p2", 3), ("p3", 50), ("p4", 10)]);

        let ranked = ranker
            .rank(
                &filter(&["electronics", "phones", "android"]),
                rows,
                &counts,
                10,
            )
            .unwrap();

        assert_eq!(ids(&ranked), vec!["p3", "p4", "p1", "p2"]);
        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.interaction_count > b.interaction_count
                    || (a.interaction_count == b.interaction_count
                        && compare_rating(a.rating, b.rating) != Ordering::Less)
            );
        }
    }

    #[test]
    fn test_limit_truncates_without_padding() {
        let ranker = ProductRanker::default();
        let rows = vec![
            ProductRow::new("a", "A", "c", Some(1.0)),
            ProductRow::new("b", "B", "c", Some(2.0)),
            ProductRow::new("c", "C", "c", Some(3.0)),
        ];

        let ranked = ranker
            .rank(&filter(&["c"]), rows.clone(), &InteractionCounts::new(), 2)
            .unwrap();
        assert_eq!(ids(&ranked), vec!["c", "b"]);

        let ranked = ranker
            .rank(&filter(&["c"]), rows, &InteractionCounts::new(), 100)
            .unwrap();
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn test_rows_outside_filter_are_dropped() {
        let ranker = ProductRanker::default();
        let rows = vec![
            ProductRow::new("in", "In", "phones", Some(4.0)),
            ProductRow::new("out", "Out", "android", Some(5.0)),
        ];
        let counts = counts(&[("out", 1000)]);

        let ranked = ranker.rank(&filter(&["phones"]), rows, &counts, 5).unwrap();
        assert_eq!(ids(&ranked), vec!["in"]);
        assert_eq!(ranked[0].interaction_count, 0);
    }

    #[test]
    fn test_missing_rating_ranks_below_zero() {
        let ranker = ProductRanker::new(MissingRatingPolicy::Lowest, 100);
        let rows = vec![
            ProductRow::new("unrated", "U", "c", None),
            ProductRow::new("zero", "Z", "c", Some(0.0)),
            ProductRow::new("good", "G", "c", Some(4.5)),
        ];

        let ranked = ranker
            .rank(&filter(&["c"]), rows, &InteractionCounts::new(), 10)
            .unwrap();
        assert_eq!(ids(&ranked), vec!["good", "zero", "unrated"]);
    }

    #[test]
    fn test_missing_rating_exclude_policy() {
        let ranker = ProductRanker::new(MissingRatingPolicy::Exclude, 100);
        let rows = vec![
            ProductRow::new("unrated", "U", "c", None),
            ProductRow::new("rated", "R", "c", Some(2.0)),
        ];
        let counts = counts(&[("unrated", 99)]);

        let ranked = ranker.rank(&filter(&["c"]), rows, &counts, 10).unwrap();
        assert_eq!(ids(&ranked), vec!["rated"]);
    }

    #[test]
    fn test_full_ties_keep_input_order() {
        let ranker = ProductRanker::default();
        let rows: Vec<ProductRow> = (0..20)
            .map(|i| ProductRow::new(&format!("p{:02}", i), "Same", "c", Some(3.0)))
            .collect();
        let counts: InteractionCounts = (0..20).map(|i| (format!("p{:02}", i), 7)).collect();

        let first = ranker
            .rank(&filter(&["c"]), rows.clone(), &counts, 20)
            .unwrap();
        let second = ranker.rank(&filter(&["c"]), rows, &counts, 20).unwrap();

        assert_eq!(first, second);
        let expected: Vec<String> = (0..20).map(|i| format!("p{:02}", i)).collect();
        assert_eq!(
            first.iter().map(|p| p.item_id.clone()).collect::<Vec<_>>(),
            expected
        );
    }

    #[test]
    fn test_empty_candidates_is_empty_result() {
        let ranker = ProductRanker::default();

        let ranked = ranker
            .rank(&filter(&["leaf"]), Vec::new(), &InteractionCounts::new(), 10)
            .unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_validate_limit_bounds() {
        let ranker = ProductRanker::default();

        assert_eq!(ranker.validate_limit(1), Ok(1));
        assert_eq!(ranker.validate_limit(100), Ok(100));
        assert_eq!(
            ranker.validate_limit(0),
            Err(RankingError::InvalidLimit { limit: 0, max: 100 })
        );
        assert!(ranker.validate_limit(101).is_err());
        assert!(ranker.validate_limit(-5).is_err());
        assert!(ranker
            .rank(&filter(&["c"]), Vec::new(), &InteractionCounts::new(), 0)
            .is_err());
    }
}

//! Non-redundant filtering of significant combinations
//!
//! Combinations are ranked by raw p-value, smaller itemsets first among
//! equal p-values. A combination is dropped when it is a subset or a
//! superset of any combination ranked before it, whether that one was kept
//! or dropped itself.

use std::cmp::Ordering;

use crate::fwer::SignificantCombination;

/// Whether every item of `small` occurs in `large`; both ascending
fn is_subset(small: &[usize], large: &[usize]) -> bool {
    if small.len() > large.len() {
        return false;
    }
    let mut rest = large.iter();
    small.iter().all(|item| rest.any(|other| other == item))
}

fn related(a: &[usize], b: &[usize]) -> bool {
    is_subset(a, b) || is_subset(b, a)
}

/// Keep the combinations not nested in any better-ranked one, in ranking order
pub fn non_redundant(mut combinations: Vec<SignificantCombination>) -> Vec<SignificantCombination> {
    combinations.sort_by(|a, b| {
        a.p_value
            .partial_cmp(&b.p_value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.arity().cmp(&b.arity()))
            .then_with(|| a.items.cmp(&b.items))
    });
    let mut seen: Vec<Vec<usize>> = Vec::with_capacity(combinations.len());
    let mut kept = Vec::new();
    for combination in combinations {
        let redundant = seen.iter().any(|earlier| related(earlier, &combination.items));
        seen.push(combination.items.clone());
        if !redundant {
            kept.push(combination);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Statistic;

    fn combination(items: &[usize], p_value: f64) -> SignificantCombination {
        SignificantCombination {
            items: items.to_vec(),
            support: 5,
            p_value,
            statistic: Statistic::PositiveCount(5),
        }
    }

    #[test]
    fn test_is_subset() {
        assert!(is_subset(&[1, 3], &[1, 2, 3]));
        assert!(is_subset(&[], &[4]));
        assert!(!is_subset(&[1, 4], &[1, 2, 3]));
        assert!(!is_subset(&[1, 2, 3], &[1, 3]));
    }

    #[test]
    fn test_prefers_smaller_itemset_on_equal_p() {
        let kept = non_redundant(vec![
            combination(&[1, 2], 0.01),
            combination(&[1], 0.01),
        ]);
        let items: Vec<_> = kept.iter().map(|c| c.items.clone()).collect();
        assert_eq!(items, vec![vec![1]]);
    }

    #[test]
    fn test_equal_p_pairs_shadow_their_union() {
        let kept = non_redundant(vec![
            combination(&[1, 2], 0.001),
            combination(&[1, 2, 3], 0.001),
            combination(&[2, 3], 0.001),
        ]);
        let items: Vec<_> = kept.iter().map(|c| c.items.clone()).collect();
        assert_eq!(items, vec![vec![1, 2], vec![2, 3]]);
    }

    #[test]
    fn test_dropped_combination_still_shadows_later_ones() {
        // {1} is dropped under {1, 2} but still rules out {1, 3}
        let kept = non_redundant(vec![
            combination(&[1, 2], 0.001),
            combination(&[1], 0.002),
            combination(&[1, 3], 0.003),
        ]);
        let items: Vec<_> = kept.iter().map(|c| c.items.clone()).collect();
        assert_eq!(items, vec![vec![1, 2]]);
    }

    #[test]
    fn test_smaller_p_wins_over_superset() {
        let kept = non_redundant(vec![
            combination(&[1, 2, 3], 0.01),
            combination(&[1], 0.001),
            combination(&[4], 0.02),
        ]);
        let items: Vec<_> = kept.iter().map(|c| c.items.clone()).collect();
        assert_eq!(items, vec![vec![1], vec![4]]);
    }

    #[test]
    fn test_unrelated_pairs_survive() {
        let kept = non_redundant(vec![
            combination(&[1, 2], 0.005),
            combination(&[1, 3], 0.005),
            combination(&[2, 3], 0.005),
        ]);
        assert_eq!(kept.len(), 3);
    }
}

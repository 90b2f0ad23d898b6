//! Mann-Whitney U test with the normal approximation
//!
//! U is computed from midranks: for the in-set group, `U = R - n(n+1)/2`,
//! which equals the pairwise count of in-set values above out-of-set values
//! with ties counted as one half.

use super::distribution::normal_upper_tail;
use super::{SignificanceTest, Statistic, Tail, TestOutcome};

#[derive(Debug, Clone)]
pub struct MannWhitneyU {
    /// 1-based midrank of each transaction's value
    ranks: Vec<f64>,
    tail: Tail,
}

/// Average ranks, ties sharing the mean of their positions
pub fn midranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &id in &order[start..end] {
            ranks[id] = rank;
        }
        start = end;
    }
    ranks
}

impl MannWhitneyU {
    pub fn new(values: &[f64], tail: Tail) -> Self {
        Self {
            ranks: midranks(values),
            tail,
        }
    }

    fn total(&self) -> usize {
        self.ranks.len()
    }

    fn p_from_z(&self, z: f64) -> f64 {
        match self.tail {
            Tail::Upper => normal_upper_tail(z),
            Tail::Both => (2.0 * normal_upper_tail(z.abs())).min(1.0),
        }
    }

    /// U statistic and z-score of the in-set group `matching`
    pub fn z_score(&self, matching: &[usize]) -> Option<(f64, f64)> {
        let n_in = matching.len() as f64;
        let n_out = self.total().checked_sub(matching.len())? as f64;
        if n_in == 0.0 || n_out == 0.0 {
            return None;
        }
        let rank_sum: f64 = matching
            .iter()
            .filter_map(|&id| self.ranks.get(id))
            .sum();
        let u = rank_sum - n_in * (n_in + 1.0) / 2.0;
        let mean = n_in * n_out / 2.0;
        let variance = n_in * n_out * (n_in + n_out + 1.0) / 12.0;
        if variance <= 0.0 {
            return None;
        }
        Some((u, (u - mean) / variance.sqrt()))
    }
}

impl SignificanceTest for MannWhitneyU {
    /// Upper tail at the largest z any group of this size can reach
    ///
    /// A group holding the top `support` ranks without ties has
    /// `U = n_in * n_out`, so `z = sqrt(3 * n_in * n_out / (N + 1))`.
    fn bound(&self, support: usize) -> f64 {
        let total = self.total();
        if support == 0 || support >= total {
            return 1.0;
        }
        let n_in = support as f64;
        let n_out = (total - support) as f64;
        let z = (3.0 * n_in * n_out / (total as f64 + 1.0)).sqrt();
        self.p_from_z(z)
    }

    fn p_value(&mut self, matching: &[usize]) -> TestOutcome {
        match self.z_score(matching) {
            Some((_, z)) => TestOutcome {
                p_value: self.p_from_z(z),
                statistic: Statistic::ZScore(z),
            },
            None => TestOutcome {
                p_value: 1.0,
                statistic: Statistic::ZScore(0.0),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// s06, s07, s09..s15 low; s01..s05 high with one tie against s08
    fn values() -> Vec<f64> {
        vec![
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 14.0,
        ]
    }

    #[test]
    fn test_midranks_ties() {
        assert_eq!(midranks(&[3.0, 1.0, 3.0, 2.0]), vec![3.5, 1.0, 3.5, 2.0]);
        assert_eq!(midranks(&[]), Vec::<f64>::new());
    }

    #[test]
    fn test_u_and_z_score() {
        let engine = MannWhitneyU::new(&values(), Tail::Upper);
        let (u, z) = engine.z_score(&[9, 10, 11, 12, 13]).unwrap();
        assert_eq!(u, 45.5);
        assert!((z - 2.510727).abs() < 1e-6);
    }

    #[test]
    fn test_p_value_greater() {
        let mut engine = MannWhitneyU::new(&values(), Tail::Upper);
        let outcome = engine.p_value(&[9, 10, 11, 12, 13]);
        assert!((outcome.p_value - 0.0060241419).abs() < 1e-9);
    }

    #[test]
    fn test_low_group_not_significant_upper() {
        let mut engine = MannWhitneyU::new(&values(), Tail::Upper);
        let outcome = engine.p_value(&[0, 1, 2]);
        assert!(outcome.p_value > 0.9);
        match outcome.statistic {
            Statistic::ZScore(z) => assert!(z < 0.0),
            other => panic!("unexpected statistic {other:?}"),
        }
    }

    #[test]
    fn test_two_sided_symmetric() {
        let mut engine = MannWhitneyU::new(&values(), Tail::Both);
        let high = engine.p_value(&[12, 13, 14]).p_value;
        let low = engine.p_value(&[0, 1, 2]).p_value;
        assert!((high - low).abs() < 1e-12);
    }

    #[test]
    fn test_empty_groups_are_one() {
        let mut engine = MannWhitneyU::new(&values(), Tail::Upper);
        let all: Vec<usize> = (0..15).collect();
        assert_eq!(engine.p_value(&[]).p_value, 1.0);
        let outcome = engine.p_value(&all);
        assert_eq!(outcome.p_value, 1.0);
        assert_eq!(outcome.statistic, Statistic::ZScore(0.0));
    }

    #[test]
    fn test_bound_closed_form() {
        let engine = MannWhitneyU::new(&values(), Tail::Upper);
        let z = (3.0_f64 * 3.0 * 12.0 / 16.0).sqrt();
        assert!((engine.bound(3) - normal_upper_tail(z)).abs() < 1e-15);
        assert_eq!(engine.bound(0), 1.0);
        assert_eq!(engine.bound(15), 1.0);
    }

    #[test]
    fn test_bound_not_above_best_partition() {
        let mut engine = MannWhitneyU::new(&values(), Tail::Upper);
        for x in 1..8 {
            let top: Vec<usize> = (15 - x..15).collect();
            assert!(engine.bound(x) <= engine.p_value(&top).p_value + 1e-15);
        }
    }
}

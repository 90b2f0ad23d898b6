//! Fisher's exact test
//!
//! For an itemset with support `x` of which `a` transactions are positive,
//! the 2x2 table is
//!
//! ```text
//!              positive   negative
//! targets         a        x - a
//! others        n1 - a   n0 - x + a
//! ```
//!
//! and `a` follows Hypergeometric(N, n1, x) under the null hypothesis.

use super::distribution::{choose_ratio, Hypergeometric};
use super::pval_table::PValueTable;
use super::{binary_positives, positives_among, SignificanceTest, Statistic, Tail, TestOutcome};
use crate::error::Result;

/// Relative slack when comparing table probabilities in the two-sided sum
const TWO_SIDED_TOLERANCE: f64 = 1e-7;

#[derive(Debug, Clone)]
pub struct FisherExact {
    values: Vec<f64>,
    total: usize,
    positives: usize,
    tail: Tail,
    pvalues: PValueTable,
    pmfs: PValueTable,
}

impl FisherExact {
    pub fn new(values: &[f64], tail: Tail) -> Result<Self> {
        let positives = binary_positives(values)?;
        Ok(Self {
            values: values.to_vec(),
            total: values.len(),
            positives,
            tail,
            pvalues: PValueTable::new(values.len()),
            pmfs: PValueTable::new(values.len()),
        })
    }

    pub fn positives(&self) -> usize {
        self.positives
    }

    pub fn negatives(&self) -> usize {
        self.total - self.positives
    }

    fn distribution(&self, support: usize) -> Hypergeometric {
        Hypergeometric::new(self.total, self.positives, support)
    }

    fn pmf(&mut self, support: usize, a: usize) -> f64 {
        let h = self.distribution(support);
        self.pmfs.get_or_insert_with(support, a, || h.pmf(a))
    }

    fn two_sided(&mut self, support: usize, a: usize) -> f64 {
        let h = self.distribution(support);
        let observed = self.pmf(support, a) * (1.0 + TWO_SIDED_TOLERANCE);
        let mut p = 0.0;
        for k in h.min_k()..=h.max_k() {
            let pmf = self.pmf(support, k);
            if pmf <= observed {
                p += pmf;
            }
        }
        p.min(1.0)
    }

    /// P-value of a table with `support` targets, `a` of them positive
    pub fn p_value_for(&mut self, support: usize, a: usize) -> f64 {
        if let Some(p) = self.pvalues.get(support, a) {
            return p;
        }
        let p = match self.tail {
            Tail::Upper => self.distribution(support).upper_tail(a),
            Tail::Both => self.two_sided(support, a),
        };
        self.pvalues.insert(support, a, p);
        p
    }
}

impl SignificanceTest for FisherExact {
    fn bound(&self, support: usize) -> f64 {
        match self.tail {
            Tail::Upper => {
                let h = self.distribution(support);
                h.upper_tail(h.max_k())
            }
            Tail::Both => {
                let smaller = self.positives.min(self.negatives());
                let extreme = choose_ratio(smaller, self.total, support);
                if self.positives == self.negatives() {
                    (2.0 * extreme).min(1.0)
                } else {
                    extreme
                }
            }
        }
    }

    fn p_value(&mut self, matching: &[usize]) -> TestOutcome {
        let a = positives_among(&self.values, matching);
        TestOutcome {
            p_value: self.p_value_for(matching.len(), a),
            statistic: Statistic::PositiveCount(a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 15 samples, 7 positives
    fn values() -> Vec<f64> {
        let mut v = vec![0.0; 8];
        v.extend(vec![1.0; 7]);
        v
    }

    #[test]
    fn test_rejects_values_outside_zero_one() {
        assert!(FisherExact::new(&[0.0, 1.0, 2.0], Tail::Upper).is_err());
    }

    #[test]
    fn test_rejects_no_positives() {
        assert!(FisherExact::new(&[0.0, 0.0, 0.0], Tail::Upper).is_err());
    }

    #[test]
    fn test_greater_p_value() {
        let mut fisher = FisherExact::new(&values(), Tail::Upper).unwrap();
        let outcome = fisher.p_value(&[10, 11, 12, 13, 14]);
        assert!((outcome.p_value - 1.0 / 143.0).abs() < 1e-12);
        assert_eq!(outcome.statistic, Statistic::PositiveCount(5));

        let p = fisher.p_value_for(6, 5);
        assert!((p - 175.0 / 5005.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_positive_overlap_is_one() {
        let mut fisher = FisherExact::new(&values(), Tail::Upper).unwrap();
        assert_eq!(fisher.p_value(&[0, 1, 2]).p_value, 1.0);
    }

    #[test]
    fn test_greater_bound() {
        let fisher = FisherExact::new(&values(), Tail::Upper).unwrap();
        assert!((fisher.bound(5) - 21.0 / 3003.0).abs() < 1e-12);
        assert!((fisher.bound(6) - 7.0 / 5005.0).abs() < 1e-12);
        assert_eq!(fisher.bound(0), 1.0);
    }

    #[test]
    fn test_two_sided_balanced_doubles() {
        let values = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let mut two = FisherExact::new(&values, Tail::Both).unwrap();
        let mut one = FisherExact::new(&values, Tail::Upper).unwrap();
        let p2 = two.p_value(&[4, 5, 6, 7]).p_value;
        let p1 = one.p_value(&[4, 5, 6, 7]).p_value;
        assert!((p2 - 2.0 * p1).abs() < 1e-12);
        assert!((two.bound(4) - 2.0 / 70.0).abs() < 1e-12);
    }

    #[test]
    fn test_two_sided_at_least_one_sided() {
        let mut two = FisherExact::new(&values(), Tail::Both).unwrap();
        let mut one = FisherExact::new(&values(), Tail::Upper).unwrap();
        let p2 = two.p_value(&[9, 10, 11, 12, 13, 14]).p_value;
        let p1 = one.p_value(&[9, 10, 11, 12, 13, 14]).p_value;
        assert!(p2 >= p1);
        assert!(p2 <= 1.0);
    }

    #[test]
    fn test_repeated_calls_identical() {
        let mut fisher = FisherExact::new(&values(), Tail::Both).unwrap();
        let first = fisher.p_value(&[3, 8, 9, 10]);
        let second = fisher.p_value(&[3, 8, 9, 10]);
        assert_eq!(first.p_value.to_bits(), second.p_value.to_bits());
    }
}

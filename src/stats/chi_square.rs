//! Chi-square test on the 2x2 table with Yates continuity correction
//!
//! One degree of freedom: the one-sided p-value is the upper normal tail of
//! `sqrt(chi)`, flipped to `1 - p` when the targets hold fewer positives than
//! expected.

use super::distribution::normal_upper_tail;
use super::pval_table::PValueTable;
use super::{binary_positives, positives_among, SignificanceTest, Statistic, Tail, TestOutcome};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ChiSquare {
    values: Vec<f64>,
    total: usize,
    positives: usize,
    tail: Tail,
    pvalues: PValueTable,
    statistics: PValueTable,
}

impl ChiSquare {
    pub fn new(values: &[f64], tail: Tail) -> Result<Self> {
        let positives = binary_positives(values)?;
        Ok(Self {
            values: values.to_vec(),
            total: values.len(),
            positives,
            tail,
            pvalues: PValueTable::new(values.len()),
            statistics: PValueTable::new(values.len()),
        })
    }

    pub fn positives(&self) -> usize {
        self.positives
    }

    fn negatives(&self) -> usize {
        self.total - self.positives
    }

    /// Yates-corrected chi-square of the table (support, a)
    fn statistic(&self, support: usize, a: usize) -> f64 {
        let n = self.total as f64;
        let x = support as f64;
        let n1 = self.positives as f64;
        let n0 = self.negatives() as f64;
        let a = a as f64;
        let observed = [a, x - a, n1 - a, n0 - x + a];
        let expected = [
            x * n1 / n,
            x * n0 / n,
            (n - x) * n1 / n,
            (n - x) * n0 / n,
        ];
        observed
            .iter()
            .zip(expected.iter())
            .filter(|(_, &e)| e > 0.0)
            .map(|(&o, &e)| {
                let diff = ((o - e).abs() - 0.5).max(0.0);
                diff * diff / e
            })
            .sum()
    }

    fn cached_statistic(&mut self, support: usize, a: usize) -> f64 {
        if let Some(chi) = self.statistics.get(support, a) {
            return chi;
        }
        let chi = self.statistic(support, a);
        self.statistics.insert(support, a, chi);
        chi
    }

    /// Chi-square statistic of the table (support, a)
    pub fn chi(&mut self, support: usize, a: usize) -> f64 {
        self.cached_statistic(support, a)
    }

    pub fn p_value_for(&mut self, support: usize, a: usize) -> f64 {
        if let Some(p) = self.pvalues.get(support, a) {
            return p;
        }
        let chi = self.cached_statistic(support, a);
        let p = if chi == 0.0 {
            1.0
        } else {
            let upper = normal_upper_tail(chi.sqrt());
            match self.tail {
                Tail::Both => (2.0 * upper).min(1.0),
                // Enriched when the observed count reaches its expectation
                Tail::Upper if a * self.total >= support * self.positives => upper,
                Tail::Upper => 1.0 - upper,
            }
        };
        self.pvalues.insert(support, a, p);
        p
    }

    /// Upper tail of the most skewed table with `a` positives
    fn extreme(&self, support: usize, a: usize) -> f64 {
        let chi = self.statistic(support, a);
        if chi == 0.0 {
            1.0
        } else {
            normal_upper_tail(chi.sqrt())
        }
    }
}

impl SignificanceTest for ChiSquare {
    fn bound(&self, support: usize) -> f64 {
        let support = support.min(self.total);
        let most_positive = self.extreme(support, support.min(self.positives));
        match self.tail {
            Tail::Upper => most_positive,
            Tail::Both => {
                let fewest = support.saturating_sub(self.negatives());
                let most_negative = self.extreme(support, fewest);
                (2.0 * most_positive.min(most_negative)).min(1.0)
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

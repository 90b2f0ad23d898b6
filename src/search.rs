//! Minimum-support search
//!
//! Picks lambda*, the support threshold whose itemset count k keeps
//! `alpha / k` at or above the minimum attainable significance level of
//! every itemset it admits. With f the engine bound, lambda is admissible
//! when
//!
//! ```text
//! floor(alpha / f(lambda - 1)) + 1  <=  k(lambda)  <=  floor(alpha / f(lambda))
//! ```
//!
//! The search starts at the largest useful support and lowers lambda until
//! the count enters that range. Binary tests delegate the walk to the miner,
//! which can prune while enumerating; both paths share [`judge`].

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{LampError, Result};
use crate::mining::{Combination, SupportLattice};
use crate::scan::{self, LevelVisitor, Step};
use crate::stats::{SignificanceTest, Tail, TestEngine, TestFamily};

/// How lambda* was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchStrategy {
    BreadthFirst,
    DepthFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Judgement {
    /// k lies in the admissible range
    Admissible,
    /// k exceeds the upper end; lowering lambda only makes it worse
    TooMany,
    /// k is below the lower end; lambda can still go down
    TooFew,
}

/// Smallest k that rules out lambda - 1, given f(lambda - 1)
pub fn admissible_bottom(budget: f64, lower_bound: f64) -> usize {
    if lower_bound <= 0.0 {
        return usize::MAX;
    }
    ((budget / lower_bound).floor() as usize).saturating_add(1)
}

/// Largest k for which alpha / k stays at or above f(lambda)
pub fn admissible_top(budget: f64, bound: f64) -> usize {
    if bound <= 0.0 {
        return usize::MAX;
    }
    (budget / bound).floor() as usize
}

/// Classify the count `k` at `lambda` against the admissible range
pub fn judge(lambda: usize, k: usize, bound: f64, lower_bound: f64, budget: f64) -> Result<Judgement> {
    if bound > lower_bound {
        return Err(LampError::BoundViolation {
            lambda,
            upper: bound,
            lower: lower_bound,
        });
    }
    let bottom = admissible_bottom(budget, lower_bound);
    let top = admissible_top(budget, bound);
    debug!(
        lambda,
        k,
        bottom,
        top,
        f_lambda = bound,
        f_lambda_minus_1 = lower_bound,
        "admissibility check"
    );
    Ok(if k > top {
        Judgement::TooMany
    } else if k >= bottom {
        Judgement::Admissible
    } else {
        Judgement::TooFew
    })
}

/// Lambda search over an arbitrary count source
///
/// Starts at `max_lambda`. When the count overshoots the range the previous,
/// larger lambda is kept; it admitted fewer itemsets than its own top.
pub fn descend_with_counts<C>(
    max_lambda: usize,
    budget: f64,
    bound: &dyn Fn(usize) -> f64,
    mut counts: C,
) -> Result<usize>
where
    C: FnMut(usize) -> Result<usize>,
{
    let start = max_lambda.max(1);
    let mut lambda = start;
    while lambda > 1 {
        let k = counts(lambda)?;
        match judge(lambda, k, bound(lambda), bound(lambda - 1), budget)? {
            Judgement::Admissible => return Ok(lambda),
            Judgement::TooMany => return Ok((lambda + 1).min(start)),
            Judgement::TooFew => lambda -= 1,
        }
    }
    Ok(1)
}

struct BreadthFirst<'a> {
    lattice: &'a SupportLattice,
    engine: &'a dyn SignificanceTest,
    budget: f64,
    start: usize,
}

impl LevelVisitor for BreadthFirst<'_> {
    fn visit(&mut self, _support: usize, _combination: &Combination) -> Result<()> {
        Ok(())
    }

    fn after_level(&mut self, lambda: usize) -> Result<Step> {
        if lambda <= 1 {
            return Ok(Step::Accept(1));
        }
        let k = self.lattice.count_at_least(lambda)?;
        let (bound, lower_bound) = self.lattice.bound_pair(lambda, self.engine)?;
        Ok(match judge(lambda, k, bound, lower_bound, self.budget)? {
            Judgement::Admissible => Step::Accept(lambda),
            Judgement::TooMany => Step::Accept((lambda + 1).min(self.start)),
            Judgement::TooFew => Step::Descend,
        })
    }
}

/// Result of the lambda search
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LambdaChoice {
    pub lambda: usize,
    /// Itemsets with support >= lambda
    pub correction_factor: usize,
    pub max_lambda: usize,
    pub strategy: SearchStrategy,
}

impl LambdaChoice {
    /// Per-test significance level alpha / k
    pub fn adjusted_level(&self, alpha: f64) -> f64 {
        if self.correction_factor == 0 {
            alpha
        } else {
            alpha / self.correction_factor as f64
        }
    }
}

/// Largest support worth starting the search from
///
/// The most frequent item's support, at most half the samples; binary tests
/// also stop at the positive count (and for two-sided tests at the smaller
/// class), beyond which the bound no longer decreases.
pub fn max_lambda(
    max_item_support: usize,
    total: usize,
    family: TestFamily,
    tail: Tail,
    positives: Option<usize>,
) -> usize {
    let mut lambda = max_item_support.min(total / 2);
    if family.is_binary() {
        if let Some(positives) = positives {
            lambda = lambda.min(positives);
            if tail == Tail::Both {
                lambda = lambda.min(total.saturating_sub(positives));
            }
        }
    }
    lambda.max(1)
}

/// Find lambda* and the correction factor for one run
pub fn find_lambda(
    lattice: &SupportLattice,
    engine: &TestEngine,
    budget: f64,
    max_lambda: usize,
) -> Result<LambdaChoice> {
    let strategy = if engine.family().is_binary() {
        SearchStrategy::DepthFirst
    } else {
        SearchStrategy::BreadthFirst
    };

    let lambda = match strategy {
        SearchStrategy::DepthFirst => lattice.depth_first_lambda(budget, max_lambda, engine)?,
        SearchStrategy::BreadthFirst => {
            let mut visitor = BreadthFirst {
                lattice,
                engine,
                budget,
                start: max_lambda.max(1),
            };
            scan::lower_support(lattice, max_lambda, &mut visitor)?.support
        }
    };
    let lambda = lambda.clamp(1, max_lambda.max(1));
    let correction_factor = lattice.count_at_least(lambda)?;
    info!(
        lambda,
        correction_factor,
        max_lambda,
        ?strategy,
        "selected minimum support"
    );
    Ok(LambdaChoice {
        lambda,
        correction_factor,
        max_lambda,
        strategy,
    })
}

//! Permutation calibration (FastWY)
//!
//! Every trial shuffles the outcome values with its own seed, then walks the
//! lattice from the top support down, tracking the smallest p-value seen.
//! The walk stops once the bound of the current level falls below that
//! minimum, because no itemset of lower support can beat it. The sorted
//! minima form the empirical null distribution from which the adjusted
//! threshold and adjusted p-values are read.
//!
//! Trials own their engine and its caches; only the lattice (itemsets and
//! bounds, both independent of the permutation) is shared.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::Result;
use crate::fwer::{self, SignificantCombination};
use crate::mining::{Combination, SupportLattice};
use crate::scan::{self, LevelVisitor, Step};
use crate::stats::{SignificanceTest, Tail, TestEngine, TestFamily};
use crate::transaction::permuted_values;

#[cfg(feature = "parallel")]
use crate::error::LampError;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Minimum p-value of one permutation trial
#[derive(Debug, Clone, PartialEq)]
pub struct PermutationRecord {
    pub seed: u64,
    pub min_p_value: f64,
    /// Itemset achieving the minimum, if any p-value fell below 1
    pub items: Option<Vec<usize>>,
    pub support: usize,
    /// P-values computed during the trial
    pub tests: usize,
    pub elapsed: Duration,
}

/// Shared inputs of every trial
#[derive(Clone, Copy)]
pub struct TrialSetup<'a> {
    pub lattice: &'a SupportLattice,
    pub family: TestFamily,
    pub tail: Tail,
    /// Unpermuted values in transaction id order
    pub values: &'a [f64],
    pub max_lambda: usize,
}

struct MinimumSearch<'a> {
    lattice: &'a SupportLattice,
    engine: TestEngine,
    max_lambda: usize,
    min_p: f64,
    best: Option<(Vec<usize>, usize)>,
    tests: usize,
}

impl LevelVisitor for MinimumSearch<'_> {
    fn visit(&mut self, support: usize, combination: &Combination) -> Result<()> {
        let outcome = self.engine.p_value(&combination.transactions);
        self.tests += 1;
        if outcome.p_value < self.min_p {
            self.min_p = outcome.p_value;
            self.best = Some((combination.items.clone(), support));
        }
        Ok(())
    }

    fn after_level(&mut self, support: usize) -> Result<Step> {
        if support <= self.max_lambda && self.min_p < self.lattice.bound(support, &self.engine)? {
            return Ok(Step::Accept(support));
        }
        Ok(Step::Descend)
    }
}

/// Run permutation trial `seed`
pub fn run_trial(setup: &TrialSetup<'_>, seed: u64) -> Result<PermutationRecord> {
    let started = Instant::now();
    let permuted = permuted_values(setup.values, seed);
    let mut search = MinimumSearch {
        lattice: setup.lattice,
        engine: TestEngine::new(setup.family, &permuted, setup.tail)?,
        max_lambda: setup.max_lambda,
        min_p: 1.0,
        best: None,
        tests: 0,
    };
    let top = setup.lattice.max_support()?.unwrap_or(1);
    let outcome = scan::lower_support(setup.lattice, top, &mut search)?;

    let (items, support) = match search.best {
        Some((items, support)) => (Some(items), support),
        None => (None, 0),
    };
    let record = PermutationRecord {
        seed,
        min_p_value: search.min_p,
        items,
        support,
        tests: search.tests,
        elapsed: started.elapsed(),
    };
    debug!(
        seed,
        min_p = record.min_p_value,
        items = ?record.items,
        support = record.support,
        stopped_at = outcome.support,
        tests = record.tests,
        elapsed_ms = record.elapsed.as_millis() as u64,
        "permutation trial"
    );
    Ok(record)
}

/// Run trials `0..permutations`, in seed order
///
/// The first failing trial aborts the calibration.
pub fn run_trials(
    setup: &TrialSetup<'_>,
    permutations: usize,
    jobs: Option<usize>,
) -> Result<Vec<PermutationRecord>> {
    setup.lattice.ensure(setup.max_lambda)?;
    let started = Instant::now();
    let records = dispatch(setup, permutations, jobs)?;
    info!(
        permutations,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "permutation trials finished"
    );
    Ok(records)
}

#[cfg(feature = "parallel")]
fn dispatch(
    setup: &TrialSetup<'_>,
    permutations: usize,
    jobs: Option<usize>,
) -> Result<Vec<PermutationRecord>> {
    let run = || {
        (0..permutations as u64)
            .into_par_iter()
            .map(|seed| run_trial(setup, seed))
            .collect::<Result<Vec<_>>>()
    };
    match jobs {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| LampError::Configuration(format!("cannot start worker pool: {}", e)))?
            .install(run),
        None => run(),
    }
}

#[cfg(not(feature = "parallel"))]
fn dispatch(
    setup: &TrialSetup<'_>,
    permutations: usize,
    _jobs: Option<usize>,
) -> Result<Vec<PermutationRecord>> {
    (0..permutations as u64)
        .map(|seed| run_trial(setup, seed))
        .collect()
}

/// Trial minima in ascending order
pub fn sorted_minima(records: &[PermutationRecord]) -> Vec<f64> {
    let mut minima: Vec<f64> = records.iter().map(|r| r.min_p_value).collect();
    minima.sort_by(f64::total_cmp);
    minima
}

/// Adjusted significance level from the ascending minima
///
/// Reads rank floor(k * alpha) (at least 1). When the next rank holds the
/// same value the index moves down until it does not, clamped at rank 1.
pub fn adjusted_threshold(sorted_minima: &[f64], alpha: f64) -> Option<f64> {
    let last = sorted_minima.len().checked_sub(1)?;
    let rank = (sorted_minima.len() as f64 * alpha).floor() as usize;
    let mut index = rank.saturating_sub(1).min(last);
    while index < last && index > 0 && sorted_minima[index] == sorted_minima[index + 1] {
        index -= 1;
    }
    Some(sorted_minima[index])
}

/// Fraction of trial minima <= each p-value, returned in input order
///
/// P-values are visited in ascending order with one pointer into the minima.
pub fn adjusted_p_values(sorted_minima: &[f64], p_values: &[f64]) -> Vec<f64> {
    let mut adjusted = vec![0.0; p_values.len()];
    if sorted_minima.is_empty() {
        return adjusted;
    }
    let mut order: Vec<usize> = (0..p_values.len()).collect();
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

    let mut pointer = 0;
    for index in order {
        let p = p_values[index];
        while pointer < sorted_minima.len() && sorted_minima[pointer] <= p {
            pointer += 1;
        }
        adjusted[index] = pointer as f64 / sorted_minima.len() as f64;
    }
    adjusted
}

struct ThresholdEnumerator<'a> {
    lattice: &'a SupportLattice,
    engine: &'a mut TestEngine,
    threshold: f64,
    max_lambda: usize,
    found: Vec<SignificantCombination>,
}

impl LevelVisitor for ThresholdEnumerator<'_> {
    fn visit(&mut self, support: usize, combination: &Combination) -> Result<()> {
        let outcome = self.engine.p_value(&combination.transactions);
        if outcome.p_value <= self.threshold {
            self.found.push(SignificantCombination {
                items: combination.items.clone(),
                support,
                p_value: outcome.p_value,
                statistic: outcome.statistic,
            });
        }
        Ok(())
    }

    fn after_level(&mut self, support: usize) -> Result<Step> {
        if support <= self.max_lambda && self.threshold < self.lattice.bound(support, &*self.engine)? {
            return Ok(Step::Accept(support));
        }
        Ok(Step::Descend)
    }
}

/// Itemsets of the unpermuted data with p <= `threshold`, sorted by p-value
pub fn enumerate_at_threshold(
    lattice: &SupportLattice,
    engine: &mut TestEngine,
    threshold: f64,
    max_lambda: usize,
) -> Result<Vec<SignificantCombination>> {
    let Some(top) = lattice.max_support()? else {
        return Ok(Vec::new());
    };
    let mut enumerator = ThresholdEnumerator {
        lattice,
        engine,
        threshold,
        max_lambda,
        found: Vec::new(),
    };
    let outcome = scan::lower_support(lattice, top, &mut enumerator)?;
    info!(
        threshold,
        stopped_at = outcome.support,
        significant = enumerator.found.len(),
        "enumerated combinations at the adjusted threshold"
    );
    let mut found = enumerator.found;
    fwer::sort_by_p_value(&mut found);
    Ok(found)
}

//! FWER enumeration at lambda*
//!
//! Re-tests every itemset with support >= lambda* and keeps those whose raw
//! p-value is below `alpha / k`.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::mining::{Combination, SupportLattice};
use crate::scan::{self, LevelVisitor, Step};
use crate::search::LambdaChoice;
use crate::stats::{SignificanceTest, Statistic, TestEngine};

/// An itemset that passed the significance threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignificantCombination {
    pub items: Vec<usize>,
    pub support: usize,
    pub p_value: f64,
    pub statistic: Statistic,
}

impl SignificantCombination {
    pub fn arity(&self) -> usize {
        self.items.len()
    }
}

/// Ascending p-value, ties broken by item ids
pub fn sort_by_p_value(combinations: &mut [SignificantCombination]) {
    combinations.sort_by(|a, b| {
        a.p_value
            .partial_cmp(&b.p_value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.items.cmp(&b.items))
    });
}

struct Enumerator<'a> {
    engine: &'a mut TestEngine,
    lambda: usize,
    level: f64,
    tested: usize,
    found: Vec<SignificantCombination>,
}

impl LevelVisitor for Enumerator<'_> {
    fn visit(&mut self, support: usize, combination: &Combination) -> Result<()> {
        let outcome = self.engine.p_value(&combination.transactions);
        self.tested += 1;
        if outcome.p_value < self.level {
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
        Ok(if support <= self.lambda {
            Step::Accept(support)
        } else {
            Step::Descend
        })
    }
}

/// Itemsets with support >= lambda* and p < alpha / k, sorted by p-value
pub fn enumerate_significant(
    lattice: &SupportLattice,
    engine: &mut TestEngine,
    choice: &LambdaChoice,
    alpha: f64,
) -> Result<Vec<SignificantCombination>> {
    if choice.correction_factor == 0 {
        return Ok(Vec::new());
    }
    lattice.ensure(choice.lambda)?;
    let top = match lattice.max_support()? {
        Some(top) if top >= choice.lambda => top,
        _ => return Ok(Vec::new()),
    };

    let mut enumerator = Enumerator {
        engine,
        lambda: choice.lambda,
        level: choice.adjusted_level(alpha),
        tested: 0,
        found: Vec::new(),
    };
    let outcome = scan::lower_support(lattice, top, &mut enumerator)?;
    debug!(
        levels = outcome.levels,
        tested = enumerator.tested,
        "significance enumeration finished"
    );
    info!(
        significant = enumerator.found.len(),
        level = enumerator.level,
        "enumerated significant combinations"
    );

    let mut found = enumerator.found;
    sort_by_p_value(&mut found);
    Ok(found)
}

//! Statistical test engines
//!
//! Each engine is built once per (test family, alternative, value vector)
//! and owns its memo tables, so permutation trials never share caches.
//! Engines expose two operations:
//!
//! - [`SignificanceTest::bound`]: the minimum attainable significance level
//!   (MASL) for an itemset of a given support, non-increasing in the support
//!   up to the search's maximum lambda.
//! - [`SignificanceTest::p_value`]: the exact p-value of one itemset given
//!   the ids of the transactions that contain it.

pub mod chi_square;
pub mod distribution;
pub mod fisher;
pub mod pval_table;
pub mod u_test;


use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{LampError, Result};

pub use chi_square::ChiSquare;
pub use fisher::FisherExact;
pub use u_test::MannWhitneyU;

/// Which test computes the p-values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestFamily {
    /// Fisher's exact test on a binary outcome
    Fisher,
    /// Chi-square test with Yates correction on a binary outcome
    Chi,
    /// Mann-Whitney U test on a continuous outcome
    #[value(name = "u-test", alias = "u_test")]
    #[serde(alias = "u_test")]
    UTest,
}

impl TestFamily {
    pub fn is_binary(self) -> bool {
        !matches!(self, TestFamily::UTest)
    }
}

impl fmt::Display for TestFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TestFamily::Fisher => "fisher",
            TestFamily::Chi => "chi",
            TestFamily::UTest => "u-test",
        })
    }
}

/// Direction of the alternative hypothesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alternative {
    /// Targets are enriched in positives / high values
    #[default]
    Greater,
    /// Targets are enriched in negatives / low values
    Less,
    #[value(alias = "two.sided")]
    #[serde(alias = "two.sided")]
    TwoSided,
}

impl Alternative {
    /// Tail the engines evaluate; `Less` runs as `Greater` on inverted values
    pub fn tail(self) -> Tail {
        match self {
            Alternative::Greater | Alternative::Less => Tail::Upper,
            Alternative::TwoSided => Tail::Both,
        }
    }

    /// Whether values are inverted at load time
    pub fn inverts_values(self) -> bool {
        self == Alternative::Less
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Alternative::Greater => "greater",
            Alternative::Less => "less",
            Alternative::TwoSided => "two-sided",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    Upper,
    Both,
}

/// Statistic reported next to a p-value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Statistic {
    /// Positive samples among the itemset's targets
    PositiveCount(usize),
    /// Normalized Mann-Whitney U
    ZScore(f64),
}

impl Statistic {
    /// Undo the load-time value inversion of a `Less` run
    pub fn restore_direction(self, support: usize) -> Self {
        match self {
            Statistic::PositiveCount(count) => {
                Statistic::PositiveCount(support.saturating_sub(count))
            }
            Statistic::ZScore(z) => Statistic::ZScore(-z),
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Statistic::PositiveCount(count) => count as f64,
            Statistic::ZScore(z) => z,
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::PositiveCount(count) => write!(f, "{}", count),
            Statistic::ZScore(z) => write!(f, "{:.6}", z),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestOutcome {
    pub p_value: f64,
    pub statistic: Statistic,
}

/// The capability every test engine provides
pub trait SignificanceTest {
    /// Minimum attainable significance level at `support`
    fn bound(&self, support: usize) -> f64;

    /// P-value of the itemset contained in the transactions `matching`
    fn p_value(&mut self, matching: &[usize]) -> TestOutcome;
}

/// Closed set of engines, selected once per run
#[derive(Debug, Clone)]
pub enum TestEngine {
    Fisher(FisherExact),
    Chi(ChiSquare),
    UTest(MannWhitneyU),
}

impl TestEngine {
    /// Build the engine for `family` over values indexed by transaction id
    pub fn new(family: TestFamily, values: &[f64], tail: Tail) -> Result<Self> {
        if values.is_empty() {
            return Err(LampError::Configuration(
                "no samples to test".to_string(),
            ));
        }
        Ok(match family {
            TestFamily::Fisher => TestEngine::Fisher(FisherExact::new(values, tail)?),
            TestFamily::Chi => TestEngine::Chi(ChiSquare::new(values, tail)?),
            TestFamily::UTest => TestEngine::UTest(MannWhitneyU::new(values, tail)),
        })
    }

    pub fn family(&self) -> TestFamily {
        match self {
            TestEngine::Fisher(_) => TestFamily::Fisher,
            TestEngine::Chi(_) => TestFamily::Chi,
            TestEngine::UTest(_) => TestFamily::UTest,
        }
    }

    /// Positive samples for binary engines
    pub fn positives(&self) -> Option<usize> {
        match self {
            TestEngine::Fisher(e) => Some(e.positives()),
            TestEngine::Chi(e) => Some(e.positives()),
            TestEngine::UTest(_) => None,
        }
    }
}

impl SignificanceTest for TestEngine {
    fn bound(&self, support: usize) -> f64 {
        match self {
            TestEngine::Fisher(e) => e.bound(support),
            TestEngine::Chi(e) => e.bound(support),
            TestEngine::UTest(e) => e.bound(support),
        }
    }

    fn p_value(&mut self, matching: &[usize]) -> TestOutcome {
        match self {
            TestEngine::Fisher(e) => e.p_value(matching),
            TestEngine::Chi(e) => e.p_value(matching),
            TestEngine::UTest(e) => e.p_value(matching),
        }
    }
}

/// Count and validate the positives of a binary value vector
pub(crate) fn binary_positives(values: &[f64]) -> Result<usize> {
    let mut positives = 0;
    for (id, &value) in values.iter().enumerate() {
        if value == 1.0 {
            positives += 1;
        } else if value != 0.0 {
            return Err(LampError::Configuration(format!(
                "transaction {} has value {} but the test requires 0 or 1",
                id, value
            )));
        }
    }
    if positives == 0 {
        return Err(LampError::Configuration(
            "no positive samples: the value file has no 1 entries".to_string(),
        ));
    }
    Ok(positives)
}

/// Positives among the given transaction ids
pub(crate) fn positives_among(values: &[f64], matching: &[usize]) -> usize {
    matching
        .iter()
        .filter(|&&id| values.get(id).copied() == Some(1.0))
        .count()
}

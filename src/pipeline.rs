//! End-to-end runs
//!
//! Loads the inputs, applies the hypothesis direction, builds the miner and
//! the test engine, and runs LAMP, FastWY or a single-combination test. The
//! reports keep item ids; formatting resolves names through the column
//! mapping they carry.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::info;

use crate::config::LampConfig;
use crate::error::{LampError, Result};
use crate::fastwy::{self, PermutationRecord, TrialSetup};
use crate::fwer::{self, SignificantCombination};
use crate::mining::{ArityLimit, ExternalLcm, ItemsetMiner, LcmMiner, SupportLattice};
use crate::reader;
use crate::redundancy;
use crate::search::{self, LambdaChoice};
use crate::stats::{Alternative, SignificanceTest, Statistic, TestEngine, TestFamily};
use crate::transaction::{ColumnMapping, TransactionStore};

/// Facts about the inputs and settings of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub item_file: PathBuf,
    pub value_file: PathBuf,
    pub alpha: f64,
    pub method: TestFamily,
    pub alternative: Alternative,
    /// Arity after normalisation against the item count
    pub arity: ArityLimit,
    pub engine: &'static str,
    pub columns: ColumnMapping,
    pub samples: usize,
    /// Positives in the input as given, binary tests only
    pub positives: Option<usize>,
}

impl RunSummary {
    pub fn item_count(&self) -> usize {
        self.columns.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Timing {
    /// Lambda search and correction factor
    pub correction: Duration,
    pub enumeration: Duration,
    pub total: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LampReport {
    pub summary: RunSummary,
    pub choice: LambdaChoice,
    /// alpha / k
    pub adjusted_level: f64,
    /// Ascending raw p-value
    pub significant: Vec<SignificantCombination>,
    pub timing: Timing,
}

impl LampReport {
    /// Bonferroni-style adjusted p-value k * p, capped at 1
    pub fn adjusted_p_value(&self, combination: &SignificantCombination) -> f64 {
        (combination.p_value * self.choice.correction_factor as f64).min(1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FastWyReport {
    pub summary: RunSummary,
    pub choice: LambdaChoice,
    pub permutations: Vec<PermutationRecord>,
    pub adjusted_threshold: f64,
    /// Ascending raw p-value
    pub significant: Vec<SignificantCombination>,
    /// Parallel to `significant`
    pub adjusted_p_values: Vec<f64>,
    pub timing: Timing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SingleTestReport {
    pub summary: RunSummary,
    pub items: Vec<usize>,
    pub support: usize,
    pub p_value: f64,
    pub statistic: Statistic,
}

/// Inputs ready for testing
struct Prepared {
    store: TransactionStore,
    summary: RunSummary,
}

fn prepare(item_file: &Path, value_file: &Path, config: &LampConfig) -> Result<Prepared> {
    config.validate().map_err(LampError::Configuration)?;
    let mut store = reader::load_store(item_file, value_file, config.delimiter)?;
    if store.is_empty() {
        return Err(LampError::Configuration("no samples in the input files".to_string()));
    }
    let binary = config.method.is_binary();
    let positives = if binary {
        store.ensure_binary()?;
        Some(store.positive_count())
    } else {
        None
    };
    if config.alternative.inverts_values() {
        store.invert_values(binary);
    }

    let arity = config.max_arity.normalized(store.item_count());
    let summary = RunSummary {
        item_file: item_file.to_path_buf(),
        value_file: value_file.to_path_buf(),
        alpha: config.alpha,
        method: config.method,
        alternative: config.alternative,
        arity,
        engine: if config.lcm_program.is_some() { "external-lcm" } else { "lcm" },
        columns: store.columns().clone(),
        samples: store.len(),
        positives,
    };
    info!(
        items = summary.item_count(),
        samples = summary.samples,
        positives = ?summary.positives,
        method = %config.method,
        alternative = %config.alternative,
        "loaded inputs"
    );
    Ok(Prepared { store, summary })
}

fn build_miner(store: &TransactionStore, config: &LampConfig) -> Result<Box<dyn ItemsetMiner>> {
    Ok(match &config.lcm_program {
        Some(program) => Box::new(ExternalLcm::new(
            program,
            store,
            Duration::from_secs(config.engine_timeout_secs),
        )?),
        None => Box::new(LcmMiner::new(store)),
    })
}

/// Undo the direction flip of a `less` run on reported statistics
fn restore_direction(alternative: Alternative, significant: &mut [SignificantCombination]) {
    if alternative.inverts_values() {
        for combination in significant {
            combination.statistic = combination.statistic.restore_direction(combination.support);
        }
    }
}

struct Calibrated {
    lattice: SupportLattice,
    engine: TestEngine,
    choice: LambdaChoice,
    values: Vec<f64>,
}

fn calibrate(prepared: &Prepared, config: &LampConfig) -> Result<Calibrated> {
    let store = &prepared.store;
    let values = store.values();
    let tail = config.alternative.tail();
    let engine = TestEngine::new(config.method, &values, tail)?;
    let lattice = SupportLattice::new(build_miner(store, config)?, prepared.summary.arity);

    let max_item_support = store.item_supports().into_iter().max().unwrap_or(0);
    let max_lambda = search::max_lambda(
        max_item_support,
        store.len(),
        config.method,
        tail,
        engine.positives(),
    );
    let choice = search::find_lambda(&lattice, &engine, config.alpha, max_lambda)?;
    Ok(Calibrated {
        lattice,
        engine,
        choice,
        values,
    })
}

/// LAMP: lambda search, then FWER enumeration at alpha / k
pub fn run_lamp(item_file: &Path, value_file: &Path, config: &LampConfig) -> Result<LampReport> {
    let started = Instant::now();
    let prepared = prepare(item_file, value_file, config)?;

    let mut calibrated = calibrate(&prepared, config)?;
    let correction = started.elapsed();

    let enumeration_started = Instant::now();
    let mut significant = fwer::enumerate_significant(
        &calibrated.lattice,
        &mut calibrated.engine,
        &calibrated.choice,
        config.alpha,
    )?;
    if config.non_redundant {
        significant = redundancy::non_redundant(significant);
    }
    restore_direction(config.alternative, &mut significant);
    let enumeration = enumeration_started.elapsed();

    Ok(LampReport {
        summary: prepared.summary,
        adjusted_level: calibrated.choice.adjusted_level(config.alpha),
        choice: calibrated.choice,
        significant,
        timing: Timing {
            correction,
            enumeration,
            total: started.elapsed(),
        },
    })
}

/// FastWY: lambda search, permutation trials, enumeration at the adjusted threshold
pub fn run_fastwy(
    item_file: &Path,
    value_file: &Path,
    config: &LampConfig,
    permutations: usize,
) -> Result<FastWyReport> {
    if permutations == 0 {
        return Err(LampError::Configuration(
            "at least one permutation is required".to_string(),
        ));
    }
    let started = Instant::now();
    let prepared = prepare(item_file, value_file, config)?;
    let mut calibrated = calibrate(&prepared, config)?;

    let setup = TrialSetup {
        lattice: &calibrated.lattice,
        family: config.method,
        tail: config.alternative.tail(),
        values: &calibrated.values,
        max_lambda: calibrated.choice.max_lambda,
    };
    let records = fastwy::run_trials(&setup, permutations, config.jobs)?;
    let minima = fastwy::sorted_minima(&records);
    let adjusted_threshold = fastwy::adjusted_threshold(&minima, config.alpha).ok_or_else(|| {
        LampError::Configuration("no permutation results to calibrate from".to_string())
    })?;
    info!(adjusted_threshold, "calibrated significance level");
    let correction = started.elapsed();

    let enumeration_started = Instant::now();
    let mut significant = fastwy::enumerate_at_threshold(
        &calibrated.lattice,
        &mut calibrated.engine,
        adjusted_threshold,
        calibrated.choice.max_lambda,
    )?;
    if config.non_redundant {
        significant = redundancy::non_redundant(significant);
    }
    let p_values: Vec<f64> = significant.iter().map(|c| c.p_value).collect();
    let adjusted_p_values = fastwy::adjusted_p_values(&minima, &p_values);
    restore_direction(config.alternative, &mut significant);
    let enumeration = enumeration_started.elapsed();

    Ok(FastWyReport {
        summary: prepared.summary,
        choice: calibrated.choice,
        permutations: records,
        adjusted_threshold,
        significant,
        adjusted_p_values,
        timing: Timing {
            correction,
            enumeration,
            total: started.elapsed(),
        },
    })
}

/// Test one named combination without any search
pub fn single_combination(
    item_file: &Path,
    value_file: &Path,
    config: &LampConfig,
    names: &[&str],
) -> Result<SingleTestReport> {
    let prepared = prepare(item_file, value_file, config)?;
    let store = &prepared.store;
    let items = store.columns().resolve(names)?;
    let matching = store.matching(&items);
    let mut engine = TestEngine::new(config.method, &store.values(), config.alternative.tail())?;
    let outcome = engine.p_value(&matching);
    let statistic = if config.alternative.inverts_values() {
        outcome.statistic.restore_direction(matching.len())
    } else {
        outcome.statistic
    };
    info!(
        items = ?items,
        support = matching.len(),
        p_value = outcome.p_value,
        bound = engine.bound(matching.len()),
        "tested single combination"
    );
    Ok(SingleTestReport {
        summary: prepared.summary,
        items,
        support: matching.len(),
        p_value: outcome.p_value,
        statistic,
    })
}

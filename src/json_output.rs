//! JSON output format
//!
//! `--format json` emits one document per run. Item ids are resolved to
//! column names; durations are reported in milliseconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fastwy::PermutationRecord;
use crate::fwer::SignificantCombination;
use crate::pipeline::{FastWyReport, LampReport, RunSummary, SingleTestReport, Timing};
use crate::search::LambdaChoice;
use crate::stats::Statistic;
use crate::transaction::ColumnMapping;

/// Inputs and settings of the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRun {
    pub item_file: String,
    pub value_file: String,
    pub alpha: f64,
    pub method: String,
    pub alternative: String,
    /// `"all"` or the arity limit
    pub max_arity: String,
    pub engine: String,
    pub items: usize,
    pub samples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positives: Option<usize>,
}

impl JsonRun {
    fn from_summary(summary: &RunSummary) -> Self {
        Self {
            item_file: summary.item_file.display().to_string(),
            value_file: summary.value_file.display().to_string(),
            alpha: summary.alpha,
            method: summary.method.to_string(),
            alternative: summary.alternative.to_string(),
            max_arity: summary.arity.to_string(),
            engine: summary.engine.to_string(),
            items: summary.item_count(),
            samples: summary.samples,
            positives: summary.positives,
        }
    }
}

/// Result of the minimum-support search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonCorrection {
    pub lambda: usize,
    pub correction_factor: usize,
    pub max_lambda: usize,
    pub strategy: String,
}

impl From<&LambdaChoice> for JsonCorrection {
    fn from(choice: &LambdaChoice) -> Self {
        Self {
            lambda: choice.lambda,
            correction_factor: choice.correction_factor,
            max_lambda: choice.max_lambda,
            strategy: match choice.strategy {
                crate::search::SearchStrategy::BreadthFirst => "breadth-first".to_string(),
                crate::search::SearchStrategy::DepthFirst => "depth-first".to_string(),
            },
        }
    }
}

/// One significant combination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonCombination {
    pub rank: usize,
    pub items: Vec<String>,
    pub arity: usize,
    pub support: usize,
    pub p_value: f64,
    pub adjusted_p_value: f64,
    pub statistic: Statistic,
}

impl JsonCombination {
    fn new(
        rank: usize,
        combination: &SignificantCombination,
        adjusted_p_value: f64,
        columns: &ColumnMapping,
    ) -> Self {
        Self {
            rank,
            items: columns.describe(&combination.items),
            arity: combination.arity(),
            support: combination.support,
            p_value: combination.p_value,
            adjusted_p_value,
            statistic: combination.statistic,
        }
    }
}

/// One permutation trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonPermutation {
    pub seed: u64,
    pub min_p_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
    pub support: usize,
    pub tests: usize,
    pub elapsed_ms: f64,
}

/// FastWY calibration results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonCalibration {
    pub permutations: usize,
    pub adjusted_threshold: f64,
    pub trials: Vec<JsonPermutation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonTiming {
    pub correction_ms: f64,
    pub enumeration_ms: f64,
    pub total_ms: f64,
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

impl From<&Timing> for JsonTiming {
    fn from(timing: &Timing) -> Self {
        Self {
            correction_ms: millis(timing.correction),
            enumeration_ms: millis(timing.enumeration),
            total_ms: millis(timing.total),
        }
    }
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    /// Crate version
    pub version: String,
    /// Format name
    pub format: String,
    /// `lamp`, `fastwy` or `single`
    pub procedure: String,
    pub run: JsonRun,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction: Option<JsonCorrection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration: Option<JsonCalibration>,
    pub combinations: Vec<JsonCombination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<JsonTiming>,
}

impl JsonOutput {
    fn new(procedure: &str, summary: &RunSummary) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "lamp-json-v1".to_string(),
            procedure: procedure.to_string(),
            run: JsonRun::from_summary(summary),
            correction: None,
            calibration: None,
            combinations: Vec::new(),
            timing: None,
        }
    }

    pub fn from_lamp(report: &LampReport) -> Self {
        let mut output = Self::new("lamp", &report.summary);
        output.correction = Some(JsonCorrection::from(&report.choice));
        output.combinations = report
            .significant
            .iter()
            .enumerate()
            .map(|(index, c)| {
                JsonCombination::new(
                    index + 1,
                    c,
                    report.adjusted_p_value(c),
                    &report.summary.columns,
                )
            })
            .collect();
        output.timing = Some(JsonTiming::from(&report.timing));
        output
    }

    pub fn from_fastwy(report: &FastWyReport) -> Self {
        let columns = &report.summary.columns;
        let mut output = Self::new("fastwy", &report.summary);
        output.correction = Some(JsonCorrection::from(&report.choice));
        output.calibration = Some(JsonCalibration {
            permutations: report.permutations.len(),
            adjusted_threshold: report.adjusted_threshold,
            trials: report
                .permutations
                .iter()
                .map(|r| permutation(r, columns))
                .collect(),
        });
        output.combinations = report
            .significant
            .iter()
            .zip(&report.adjusted_p_values)
            .enumerate()
            .map(|(index, (c, adjusted))| JsonCombination::new(index + 1, c, *adjusted, columns))
            .collect();
        output.timing = Some(JsonTiming::from(&report.timing));
        output
    }

    pub fn from_single(report: &SingleTestReport) -> Self {
        let mut output = Self::new("single", &report.summary);
        output.combinations = vec![JsonCombination {
            rank: 1,
            items: report.summary.columns.describe(&report.items),
            arity: report.items.len(),
            support: report.support,
            p_value: report.p_value,
            adjusted_p_value: report.p_value,
            statistic: report.statistic,
        }];
        output
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn permutation(record: &PermutationRecord, columns: &ColumnMapping) -> JsonPermutation {
    JsonPermutation {
        seed: record.seed,
        min_p_value: record.min_p_value,
        items: record.items.as_ref().map(|items| columns.describe(items)),
        support: record.support,
        tests: record.tests,
        elapsed_ms: millis(record.elapsed),
    }
}

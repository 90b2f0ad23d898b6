//! Tab-separated text report (the default output format)
//!
//! A block of `#` header lines describing the run, the ranked table of
//! significant combinations and a timing trailer.

use std::time::Duration;

use crate::fastwy::PermutationRecord;
use crate::fwer::SignificantCombination;
use crate::pipeline::{FastWyReport, LampReport, RunSummary, SingleTestReport, Timing};
use crate::stats::TestFamily;
use crate::transaction::ColumnMapping;

/// printf-style `%.{precision}g`
pub fn format_g(value: f64, precision: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

fn seconds(duration: Duration) -> String {
    format!("{:.3}", duration.as_secs_f64())
}

fn statistic_label(method: TestFamily) -> &'static str {
    match method {
        TestFamily::UTest => "z-score",
        TestFamily::Fisher | TestFamily::Chi => "# of positives in the targets",
    }
}

fn summary_header(title: &str, summary: &RunSummary) -> Vec<String> {
    let mut lines = vec![
        format!("# {} ver. {}", title, env!("CARGO_PKG_VERSION")),
        format!("# item-file: {}", summary.item_file.display()),
        format!("# value-file: {}", summary.value_file.display()),
        format!("# significance-level: {}", summary.alpha),
        format!(
            "# P-value computing procedure: {} ({})",
            summary.method, summary.alternative
        ),
    ];
    let mut counts = format!(
        "# # of tested elements: {}, # of samples: {}",
        summary.item_count(),
        summary.samples
    );
    if let Some(positives) = summary.positives {
        counts.push_str(&format!(", # of positive samples: {}", positives));
    }
    lines.push(counts);
    lines.push(format!("# Maximum arity: {}", summary.arity));
    lines
}

fn table_header(method: TestFamily) -> String {
    format!(
        "Rank\tRaw p-value\tAdjusted p-value\tCombination\tArity\t# of target rows\t{}",
        statistic_label(method)
    )
}

fn table_row(
    rank: usize,
    combination: &SignificantCombination,
    adjusted_p_value: f64,
    columns: &ColumnMapping,
) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        rank,
        format_g(combination.p_value, 5),
        format_g(adjusted_p_value, 5),
        columns.describe(&combination.items).join(","),
        combination.arity(),
        combination.support,
        combination.statistic
    )
}

fn timing_trailer(timing: &Timing) -> String {
    format!(
        "Time (sec.): Computing correction factor {}, Enumerating significant combinations {}, Total {}",
        seconds(timing.correction),
        seconds(timing.enumeration),
        seconds(timing.total)
    )
}

fn finish(lines: Vec<String>) -> String {
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

pub fn render_lamp(report: &LampReport) -> String {
    let summary = &report.summary;
    let mut lines = summary_header("LAMP", summary);
    lines.push(format!(
        "# Adjusted significance level: {}, Correction factor: {} (# of target rows >= {})",
        format_g(report.adjusted_level, 5),
        report.choice.correction_factor,
        report.choice.lambda
    ));
    lines.push(format!(
        "# # of significant combinations: {}",
        report.significant.len()
    ));
    if !report.significant.is_empty() {
        lines.push(table_header(summary.method));
        for (index, combination) in report.significant.iter().enumerate() {
            lines.push(table_row(
                index + 1,
                combination,
                report.adjusted_p_value(combination),
                &summary.columns,
            ));
        }
    }
    lines.push(timing_trailer(&report.timing));
    finish(lines)
}

pub fn render_fastwy(report: &FastWyReport) -> String {
    let summary = &report.summary;
    let mut lines = summary_header("FastWY", summary);
    lines.push(format!("# # of permutations: {}", report.permutations.len()));
    lines.push(format!(
        "# Minimum support: {} (correction factor {})",
        report.choice.lambda, report.choice.correction_factor
    ));
    lines.push(format!(
        "# Adjusted significance level: {}",
        format_g(report.adjusted_threshold, 5)
    ));
    lines.push(format!(
        "# # of significant combinations: {}",
        report.significant.len()
    ));
    if !report.significant.is_empty() {
        lines.push(table_header(summary.method));
        for (index, (combination, adjusted)) in report
            .significant
            .iter()
            .zip(&report.adjusted_p_values)
            .enumerate()
        {
            lines.push(table_row(index + 1, combination, *adjusted, &summary.columns));
        }
    }
    lines.push(timing_trailer(&report.timing));
    finish(lines)
}

pub fn render_single(report: &SingleTestReport) -> String {
    let summary = &report.summary;
    let mut lines = summary_header("LAMP", summary);
    lines.push(format!(
        "Combination\tArity\t# of target rows\tRaw p-value\t{}",
        statistic_label(summary.method)
    ));
    lines.push(format!(
        "{}\t{}\t{}\t{}\t{}",
        summary.columns.describe(&report.items).join(","),
        report.items.len(),
        report.support,
        format_g(report.p_value, 5),
        report.statistic
    ));
    finish(lines)
}

/// One line per permutation trial, for `--min-p-dist`
pub fn render_min_p_distribution(records: &[PermutationRecord], columns: &ColumnMapping) -> String {
    let mut lines = vec![
        "Seed\tMinimum p-value\t# of target rows\t# of tests\tTime (sec.)\tCombination".to_string(),
    ];
    for record in records {
        let combination = record
            .items
            .as_ref()
            .map(|items| columns.describe(items).join(","))
            .unwrap_or_default();
        lines.push(format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            record.seed,
            format_g(record.min_p_value, 5),
            record.support,
            record.tests,
            seconds(record.elapsed),
            combination
        ));
    }
    finish(lines)
}

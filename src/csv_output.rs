//! CSV output format
//!
//! `--format csv`: one row per significant combination, for spreadsheets and
//! machine parsing. Run metadata is left to the text and JSON formats.

use crate::fwer::SignificantCombination;
use crate::pipeline::{FastWyReport, LampReport, SingleTestReport};
use crate::stats::Statistic;
use crate::transaction::ColumnMapping;

/// CSV record for one combination
#[derive(Debug, Clone)]
pub struct CsvCombination {
    pub rank: usize,
    pub p_value: f64,
    pub adjusted_p_value: f64,
    pub items: Vec<String>,
    pub support: usize,
    pub statistic: Statistic,
}

impl CsvCombination {
    fn new(
        rank: usize,
        combination: &SignificantCombination,
        adjusted_p_value: f64,
        columns: &ColumnMapping,
    ) -> Self {
        Self {
            rank,
            p_value: combination.p_value,
            adjusted_p_value,
            items: columns.describe(&combination.items),
            support: combination.support,
            statistic: combination.statistic,
        }
    }
}

/// CSV output formatter
#[derive(Debug, Default)]
pub struct CsvOutput {
    rows: Vec<CsvCombination>,
}

impl CsvOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lamp(report: &LampReport) -> Self {
        let rows = report
            .significant
            .iter()
            .enumerate()
            .map(|(index, c)| {
                CsvCombination::new(
                    index + 1,
                    c,
                    report.adjusted_p_value(c),
                    &report.summary.columns,
                )
            })
            .collect();
        Self { rows }
    }

    pub fn from_fastwy(report: &FastWyReport) -> Self {
        let rows = report
            .significant
            .iter()
            .zip(&report.adjusted_p_values)
            .enumerate()
            .map(|(index, (c, adjusted))| {
                CsvCombination::new(index + 1, c, *adjusted, &report.summary.columns)
            })
            .collect();
        Self { rows }
    }

    pub fn from_single(report: &SingleTestReport) -> Self {
        let mut output = Self::new();
        output.add_row(CsvCombination {
            rank: 1,
            p_value: report.p_value,
            adjusted_p_value: report.p_value,
            items: report.summary.columns.describe(&report.items),
            support: report.support,
            statistic: report.statistic,
        });
        output
    }

    pub fn add_row(&mut self, row: CsvCombination) {
        self.rows.push(row);
    }

    fn header(&self) -> String {
        [
            "rank",
            "p_value",
            "adjusted_p_value",
            "combination",
            "arity",
            "support",
            "statistic",
        ]
        .join(",")
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_row(&self, row: &CsvCombination) -> String {
        [
            row.rank.to_string(),
            row.p_value.to_string(),
            row.adjusted_p_value.to_string(),
            Self::escape_field(&row.items.join(",")),
            row.items.len().to_string(),
            row.support.to_string(),
            row.statistic.as_f64().to_string(),
        ]
        .join(",")
    }

    pub fn to_csv(&self) -> String {
        let mut output = self.header();
        output.push('\n');
        for row in &self.rows {
            output.push_str(&self.format_row(row));
            output.push('\n');
        }
        output
    }
}

//! CLI argument parsing for LAMP

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::LampConfig;
use crate::mining::ArityLimit;
use crate::stats::{Alternative, TestFamily};

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tab-separated report with `#` header lines (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

fn parse_delimiter(value: &str) -> Result<char, String> {
    match value {
        "tab" | "\\t" => Ok('\t'),
        _ => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(format!("delimiter must be a single character, got '{}'", value)),
            }
        }
    }
}

fn parse_alpha(value: &str) -> Result<f64, String> {
    let alpha: f64 = value
        .parse()
        .map_err(|_| format!("invalid significance level '{}'", value))?;
    if alpha > 0.0 && alpha <= 1.0 {
        Ok(alpha)
    } else {
        Err(format!("significance level must be in (0, 1], got {}", alpha))
    }
}

#[derive(Parser, Debug)]
#[command(name = "lamp")]
#[command(version)]
#[command(
    about = "Significant itemset discovery with LAMP and FastWY multiple-testing correction",
    long_about = None
)]
pub struct Cli {
    /// Item-presence file: header of item names, one 0/1 row per sample
    #[arg(value_name = "ITEM_FILE")]
    pub item_file: PathBuf,

    /// Value file: sample name and outcome value per line
    #[arg(value_name = "VALUE_FILE")]
    pub value_file: PathBuf,

    /// Family-wise significance level (default: 0.05)
    #[arg(value_name = "ALPHA", value_parser = parse_alpha)]
    pub alpha: Option<f64>,

    /// P-value procedure
    #[arg(short = 'p', long = "pvalue", value_enum, value_name = "METHOD")]
    pub method: Option<TestFamily>,

    /// Maximum combination size, or "all"
    #[arg(long = "max-comb", value_name = "N")]
    pub max_comb: Option<ArityLimit>,

    /// Alternative hypothesis
    #[arg(long = "alternative", value_enum)]
    pub alternative: Option<Alternative>,

    /// Write a DEBUG-level log of the run to this file
    #[arg(short = 'e', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Calibrate with this many permutations (FastWY)
    #[arg(short = 'k', long = "permutations", value_name = "N")]
    pub permutations: Option<usize>,

    /// Write the per-permutation minimum p-values to this file (requires -k)
    #[arg(long = "min-p-dist", value_name = "FILE", requires = "permutations")]
    pub min_p_dist: Option<PathBuf>,

    /// LCM-compatible executable to use instead of the built-in miner
    #[arg(long = "lcm", value_name = "PATH")]
    pub lcm: Option<PathBuf>,

    /// Timeout for one external miner run
    #[arg(long = "lcm-timeout", value_name = "SECS")]
    pub lcm_timeout: Option<u64>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Drop combinations nested in a more significant one
    #[arg(long = "non-redundant")]
    pub non_redundant: bool,

    /// Input field delimiter ("tab" for tab-separated files)
    #[arg(long = "delimiter", value_name = "CHAR", value_parser = parse_delimiter)]
    pub delimiter: Option<char>,

    /// TOML configuration file; flags override its values
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Test only this comma-separated combination of item names
    #[arg(long = "combination", value_name = "ITEMS", value_delimiter = ',', conflicts_with = "permutations")]
    pub combination: Option<Vec<String>>,

    /// Worker threads for permutation trials
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// Enable debug logging on stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Overlay the explicitly given flags on `config`
    pub fn apply_to(&self, mut config: LampConfig) -> LampConfig {
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(method) = self.method {
            config.method = method;
        }
        if let Some(max_comb) = self.max_comb {
            config.max_arity = max_comb;
        }
        if let Some(alternative) = self.alternative {
            config.alternative = alternative;
        }
        if self.permutations.is_some() {
            config.permutations = self.permutations;
        }
        if let Some(lcm) = &self.lcm {
            config.lcm_program = Some(lcm.clone());
        }
        if let Some(timeout) = self.lcm_timeout {
            config.engine_timeout_secs = timeout;
        }
        if self.non_redundant {
            config.non_redundant = true;
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        if self.jobs.is_some() {
            config.jobs = self.jobs;
        }
        config
    }
}

//! Run configuration
//!
//! Everything a run needs besides the two input files. Loaded from TOML with
//! `--config`; explicit command-line flags override the file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::mining::ArityLimit;
use crate::stats::{Alternative, TestFamily};

/// Settings of one LAMP or FastWY run
///
/// # Example
/// ```
/// use lamp::config::LampConfig;
///
/// let config = LampConfig::default();
/// assert_eq!(config.alpha, 0.05);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LampConfig {
    /// Family-wise significance level
    pub alpha: f64,

    /// Statistical test
    pub method: TestFamily,

    pub alternative: Alternative,

    /// Largest itemset size tested, `"all"` for closed itemsets of any size
    pub max_arity: ArityLimit,

    /// Number of permutation trials; enables FastWY calibration when set
    pub permutations: Option<usize>,

    /// LCM-compatible executable used instead of the in-process miner
    pub lcm_program: Option<PathBuf>,

    /// Wall-clock limit for one external miner invocation
    pub engine_timeout_secs: u64,

    /// Field delimiter of both input files
    pub delimiter: char,

    /// Worker threads for permutation trials, all cores when unset
    pub jobs: Option<usize>,

    /// Drop significant combinations nested in a better one
    pub non_redundant: bool,
}

impl Default for LampConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            method: TestFamily::Fisher,
            alternative: Alternative::Greater,
            max_arity: ArityLimit::Unlimited,
            permutations: None,
            lcm_program: None,
            engine_timeout_secs: 600,
            delimiter: ',',
            jobs: None,
            non_redundant: false,
        }
    }
}

impl LampConfig {
    /// Looser level for screening runs
    pub fn exploratory() -> Self {
        Self {
            alpha: 0.10,
            ..Self::default()
        }
    }

    /// Stricter level with non-redundant output
    pub fn strict() -> Self {
        Self {
            alpha: 0.01,
            non_redundant: true,
            ..Self::default()
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(format!("alpha must be in (0, 1], got {}", self.alpha));
        }

        if self.permutations == Some(0) {
            return Err("permutations must be >= 1".to_string());
        }

        if self.engine_timeout_secs == 0 {
            return Err("engine_timeout_secs must be positive".to_string());
        }

        if self.max_arity == ArityLimit::AtMost(0) {
            return Err("max_arity must be >= 1".to_string());
        }

        if self.jobs == Some(0) {
            return Err("jobs must be >= 1".to_string());
        }

        if self.delimiter == '\n' || self.delimiter == '"' {
            return Err(format!("unusable delimiter {:?}", self.delimiter));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LampConfig::default();
        assert_eq!(config.alpha, 0.05);
        assert_eq!(config.method, TestFamily::Fisher);
        assert_eq!(config.alternative, Alternative::Greater);
        assert_eq!(config.max_arity, ArityLimit::Unlimited);
        assert_eq!(config.engine_timeout_secs, 600);
        assert_eq!(config.delimiter, ',');
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let exploratory = LampConfig::exploratory();
        assert_eq!(exploratory.alpha, 0.10);
        assert!(exploratory.validate().is_ok());

        let strict = LampConfig::strict();
        assert_eq!(strict.alpha, 0.01);
        assert!(strict.non_redundant);
        assert!(strict.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = LampConfig::from_toml_str(
            r#"
alpha = 0.1
method = "u_test"
alternative = "two.sided"
max_arity = 3
permutations = 1000
delimiter = "\t"
"#,
        )
        .unwrap();
        assert_eq!(config.alpha, 0.1);
        assert_eq!(config.method, TestFamily::UTest);
        assert_eq!(config.alternative, Alternative::TwoSided);
        assert_eq!(config.max_arity, ArityLimit::AtMost(3));
        assert_eq!(config.permutations, Some(1000));
        assert_eq!(config.delimiter, '\t');
        assert_eq!(config.engine_timeout_secs, 600);
    }

    #[test]
    fn test_from_toml_all_arity() {
        let config = LampConfig::from_toml_str("max_arity = \"all\"\nmethod = \"chi\"").unwrap();
        assert_eq!(config.max_arity, ArityLimit::Unlimited);
        assert_eq!(config.method, TestFamily::Chi);
    }

    #[test]
    fn test_from_toml_rejects_unknown_key() {
        assert!(LampConfig::from_toml_str("alpah = 0.1").is_err());
        assert!(LampConfig::from_toml_str("max_arity = 0").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"alpha = 0.01\nnon_redundant = true\n").unwrap();
        let config = LampConfig::from_file(file.path()).unwrap();
        assert_eq!(config, LampConfig::strict());
    }

    #[test]
    fn test_from_missing_file() {
        let err = LampConfig::from_file("/nonexistent/lamp.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_alpha() {
        let mut config = LampConfig::default();
        config.alpha = 0.0;
        assert!(config.validate().is_err());
        config.alpha = 1.5;
        assert!(config.validate().is_err());
        config.alpha = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_counts() {
        let mut config = LampConfig::default();
        config.permutations = Some(0);
        assert!(config.validate().is_err());

        let mut config = LampConfig::default();
        config.engine_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = LampConfig::default();
        config.jobs = Some(0);
        assert!(config.validate().is_err());
    }
}

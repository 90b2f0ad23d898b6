//! Error types for LAMP runs
//!
//! Every error is fatal for the run that raised it. Nothing in the library
//! retries: a failed mining call, a broken bound, or a malformed input file
//! aborts the search and is surfaced to the caller unchanged.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading data or running a search
#[derive(Error, Debug)]
pub enum LampError {
    /// Invalid run setup, raised before any search begins
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The minimum attainable significance level grew with the support
    #[error(
        "MASL error: f({lambda}) = {upper:e} is larger than f({}) = {lower:e}",
        .lambda - 1
    )]
    BoundViolation {
        lambda: usize,
        upper: f64,
        lower: f64,
    },

    /// The itemset miner failed or returned malformed output
    #[error("Mining engine error: {0}")]
    Engine(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file violates the item/value file format
    #[error("{}:{line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl LampError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

/// Result type for LAMP operations
pub type Result<T> = std::result::Result<T, LampError>;

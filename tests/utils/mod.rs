//! Shared helpers for integration tests
//!
//! Fixtures live in `tests/fixtures`; ad-hoc inputs are written to a
//! temporary directory that is removed when the returned guard drops.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Absolute path of a file under `tests/fixtures`
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn items() -> PathBuf {
    fixture("items.csv")
}

/// Binary outcome: s01-s05, s08 and s09 are positive
pub fn values() -> PathBuf {
    fixture("values.csv")
}

/// `1 - v` of [`values`]
pub fn values_reversed() -> PathBuf {
    fixture("values_reversed.csv")
}

/// Continuous outcome, highest for s01-s05 and s08
pub fn expression() -> PathBuf {
    fixture("expression.csv")
}

/// `-v` of [`expression`]
pub fn expression_reversed() -> PathBuf {
    fixture("expression_reversed.csv")
}

/// Temporary directory holding named input files
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, content).unwrap();
        path
    }
}

/// Item table text with the given columns, one `(sample, present items)` row each
pub fn item_table(columns: &[&str], rows: &[(&str, &[&str])]) -> String {
    let mut text = format!("#sample,{}\n", columns.join(","));
    for (sample, present) in rows {
        let flags: Vec<&str> = columns
            .iter()
            .map(|c| if present.contains(c) { "1" } else { "0" })
            .collect();
        text.push_str(&format!("{},{}\n", sample, flags.join(",")));
    }
    text
}

/// Value file text from `(sample, value)` pairs
pub fn value_table(rows: &[(&str, f64)]) -> String {
    let mut text = String::from("#sample,value\n");
    for (sample, value) in rows {
        text.push_str(&format!("{},{}\n", sample, value));
    }
    text
}

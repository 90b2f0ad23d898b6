//! Item-presence and value file parsing
//!
//! Item file: a header row (first cell is a label, the rest are item names)
//! followed by one row per sample with a 0/1 flag per item. Value file: one
//! `name,value` row per sample; lines starting with `#` are comments.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use fnv::FnvHashMap;

use crate::error::{LampError, Result};
use crate::transaction::{ColumnMapping, Transaction, TransactionStore};

/// Parsed item-presence file
#[derive(Debug, Clone, PartialEq)]
pub struct ItemTable {
    pub columns: ColumnMapping,
    /// (sample name, 1-based ids of present items)
    pub rows: Vec<(String, Vec<usize>)>,
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| LampError::io(path, e))
}

fn split_row(line: &str, delimiter: char) -> Vec<&str> {
    line.split(delimiter).map(str::trim).collect()
}

pub fn read_item_table(path: &Path, delimiter: char) -> Result<ItemTable> {
    parse_item_table(&read_text(path)?, path, delimiter)
}

pub fn parse_item_table(text: &str, path: &Path, delimiter: char) -> Result<ItemTable> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines
        .next()
        .ok_or_else(|| LampError::parse(path, 1, "item file is empty"))?;
    let header = split_row(header.trim_end_matches('\r'), delimiter);
    let names: Vec<String> = header.iter().skip(1).map(|s| s.to_string()).collect();
    if names.is_empty() {
        return Err(LampError::parse(path, 1, "header names no items"));
    }
    let mut seen = BTreeSet::new();
    for name in &names {
        if !seen.insert(name.as_str()) {
            return Err(LampError::parse(
                path,
                1,
                format!("duplicate item name '{}'", name),
            ));
        }
    }

    let mut rows = Vec::new();
    let mut samples = BTreeSet::new();
    for (index, line) in lines {
        let line_no = index + 1;
        let fields = split_row(line.trim_end_matches('\r'), delimiter);
        if fields.len() != names.len() + 1 {
            return Err(LampError::parse(
                path,
                line_no,
                format!(
                    "expected {} columns, found {}",
                    names.len() + 1,
                    fields.len()
                ),
            ));
        }
        let sample = fields[0].to_string();
        if !samples.insert(sample.clone()) {
            return Err(LampError::parse(
                path,
                line_no,
                format!("duplicate sample name '{}'", sample),
            ));
        }
        let mut items = Vec::new();
        for (column, flag) in fields[1..].iter().enumerate() {
            match *flag {
                "1" => items.push(column + 1),
                "0" => {}
                other => {
                    return Err(LampError::parse(
                        path,
                        line_no,
                        format!("item flag must be 0 or 1, found '{}'", other),
                    ))
                }
            }
        }
        rows.push((sample, items));
    }

    Ok(ItemTable {
        columns: ColumnMapping::new(names),
        rows,
    })
}

pub fn read_values(path: &Path, delimiter: char) -> Result<Vec<(String, f64)>> {
    parse_values(&read_text(path)?, path, delimiter)
}

pub fn parse_values(text: &str, path: &Path, delimiter: char) -> Result<Vec<(String, f64)>> {
    let mut values = Vec::new();
    let mut seen = BTreeSet::new();
    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields = split_row(line, delimiter);
        if fields.len() != 2 {
            return Err(LampError::parse(
                path,
                line_no,
                format!("expected 2 columns, found {}", fields.len()),
            ));
        }
        let value: f64 = fields[1].parse().map_err(|_| {
            LampError::parse(
                path,
                line_no,
                format!("value '{}' is not numeric", fields[1]),
            )
        })?;
        if !value.is_finite() {
            return Err(LampError::parse(
                path,
                line_no,
                format!("value '{}' is not finite", fields[1]),
            ));
        }
        if !seen.insert(fields[0].to_string()) {
            return Err(LampError::parse(
                path,
                line_no,
                format!("duplicate sample name '{}'", fields[0]),
            ));
        }
        values.push((fields[0].to_string(), value));
    }
    Ok(values)
}

/// Samples that appear in only one of the two files
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleMismatch {
    pub only_in_items: Vec<String>,
    pub only_in_values: Vec<String>,
}

impl SampleMismatch {
    pub fn is_empty(&self) -> bool {
        self.only_in_items.is_empty() && self.only_in_values.is_empty()
    }
}

pub fn check_samples(table: &ItemTable, values: &[(String, f64)]) -> SampleMismatch {
    let item_names: BTreeSet<&str> = table.rows.iter().map(|(n, _)| n.as_str()).collect();
    let value_names: BTreeSet<&str> = values.iter().map(|(n, _)| n.as_str()).collect();
    SampleMismatch {
        only_in_items: item_names
            .difference(&value_names)
            .map(|s| s.to_string())
            .collect(),
        only_in_values: value_names
            .difference(&item_names)
            .map(|s| s.to_string())
            .collect(),
    }
}

/// Combine a parsed item table with outcome values into a store
pub fn build_store(table: ItemTable, values: &[(String, f64)]) -> Result<TransactionStore> {
    let mismatch = check_samples(&table, values);
    if !mismatch.is_empty() {
        let mut message = String::from("sample names differ between item and value files");
        if !mismatch.only_in_items.is_empty() {
            message.push_str(&format!(
                "; only in item file: {}",
                mismatch.only_in_items.join(", ")
            ));
        }
        if !mismatch.only_in_values.is_empty() {
            message.push_str(&format!(
                "; only in value file: {}",
                mismatch.only_in_values.join(", ")
            ));
        }
        return Err(LampError::Configuration(message));
    }

    let lookup: FnvHashMap<&str, f64> = values.iter().map(|(n, v)| (n.as_str(), *v)).collect();
    let mut transactions = Vec::with_capacity(table.rows.len());
    for (name, items) in table.rows {
        let value = lookup.get(name.as_str()).copied().unwrap_or_default();
        transactions.push(Transaction::new(name, items, value));
    }
    Ok(TransactionStore::new(transactions, table.columns))
}

/// Read both input files and build the value-sorted store
pub fn load_store(item_path: &Path, value_path: &Path, delimiter: char) -> Result<TransactionStore> {
    let table = read_item_table(item_path, delimiter)?;
    let values = read_values(value_path, delimiter)?;
    tracing::debug!(
        items = table.columns.len(),
        samples = table.rows.len(),
        "loaded item table from {}",
        item_path.display()
    );
    build_store(table, &values)
}

//! External LCM engine
//!
//! Runs an LCM-compatible binary over a transaction file:
//!
//! ```text
//! PROGRAM CIfq [-u ARITY] INPUT MINSUP OUTPUT    (closed itemsets)
//! PROGRAM FIfq -u ARITY INPUT MINSUP OUTPUT      (frequent itemsets)
//! ```
//!
//! The input has one line of item ids per transaction in store order. The
//! output holds two lines per itemset: `items... (support)` followed by the
//! 0-based ids of the transactions containing it.

use std::ffi::OsString;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use regex::Regex;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{ArityLimit, Combination, ItemsetMiner, Lattice};
use crate::error::{LampError, Result};
use crate::transaction::TransactionStore;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct ExternalLcm {
    program: PathBuf,
    timeout: Duration,
    input: NamedTempFile,
    total: usize,
    itemset_line: Regex,
}

impl ExternalLcm {
    pub fn new(program: impl Into<PathBuf>, store: &TransactionStore, timeout: Duration) -> Result<Self> {
        Self::from_itemsets(program, &store.itemsets(), timeout)
    }

    pub fn from_itemsets(
        program: impl Into<PathBuf>,
        itemsets: &[Vec<usize>],
        timeout: Duration,
    ) -> Result<Self> {
        let mut input = NamedTempFile::new()
            .map_err(|e| LampError::io(std::env::temp_dir(), e))?;
        {
            let path = input.path().to_path_buf();
            let file = input.as_file_mut();
            for items in itemsets {
                let line: Vec<String> = items.iter().map(usize::to_string).collect();
                writeln!(file, "{}", line.join(" ")).map_err(|e| LampError::io(&path, e))?;
            }
            file.flush().map_err(|e| LampError::io(&path, e))?;
        }
        let itemset_line = Regex::new(r"^(?P<items>[0-9\s]*)\((?P<support>[0-9]+)\)\s*$")
            .map_err(|e| LampError::Engine(e.to_string()))?;
        Ok(Self {
            program: program.into(),
            timeout,
            input,
            total: itemsets.len(),
            itemset_line,
        })
    }

    pub fn input_path(&self) -> &Path {
        self.input.path()
    }

    /// Command-line arguments for one enumeration
    pub fn arguments(min_support: usize, arity: ArityLimit, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        match arity {
            ArityLimit::Unlimited => args.push("CIfq".into()),
            ArityLimit::AtMost(limit) => {
                args.push("FIfq".into());
                args.push("-u".into());
                args.push(limit.to_string().into());
            }
        }
        args.push(input.as_os_str().to_owned());
        args.push(min_support.to_string().into());
        args.push(output.as_os_str().to_owned());
        args
    }

    fn run(&self, args: &[OsString]) -> Result<()> {
        let mut stderr_file =
            tempfile::tempfile().map_err(|e| LampError::io(std::env::temp_dir(), e))?;
        let stderr_handle = stderr_file
            .try_clone()
            .map_err(|e| LampError::io(std::env::temp_dir(), e))?;

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(stderr_handle)
            .spawn()
            .map_err(|e| {
                LampError::Engine(format!(
                    "failed to start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.timeout => {
                    if let Err(e) = child.kill() {
                        warn!("failed to kill {}: {}", self.program.display(), e);
                    }
                    let _ = child.wait();
                    return Err(LampError::Engine(format!(
                        "{} timed out after {:?}",
                        self.program.display(),
                        self.timeout
                    )));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(LampError::Engine(format!(
                        "failed to wait for {}: {}",
                        self.program.display(),
                        e
                    )))
                }
            }
        };

        if !status.success() {
            let mut stderr = String::new();
            let _ = stderr_file.seek(SeekFrom::Start(0));
            let _ = stderr_file.read_to_string(&mut stderr);
            return Err(LampError::Engine(format!(
                "{} exited with {}: {}",
                self.program.display(),
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    /// Parse the engine's output into a lattice
    pub fn parse_output(&self, text: &str, min_support: usize) -> Result<Lattice> {
        let mut lattice = Lattice::new(min_support);
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .peekable();
        while let Some((index, line)) = lines.next() {
            let captures = self.itemset_line.captures(line).ok_or_else(|| {
                LampError::Engine(format!("malformed itemset line {}: '{}'", index + 1, line))
            })?;
            let support: usize = captures["support"]
                .parse()
                .map_err(|_| LampError::Engine(format!("bad support on line {}", index + 1)))?;
            let mut items = captures["items"]
                .split_whitespace()
                .map(|s| s.parse::<usize>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| LampError::Engine(format!("bad item id on line {}", index + 1)))?;
            items.sort_unstable();

            // the id line of an itemset covering every transaction may be omitted
            let transactions = match lines.peek() {
                Some(&(ids_index, ids)) if !self.itemset_line.is_match(ids) => {
                    lines.next();
                    parse_ids(ids, ids_index + 1)?
                }
                _ if support == self.total => (0..self.total).collect(),
                _ => {
                    return Err(LampError::Engine(format!(
                        "itemset on line {} has no transaction id line",
                        index + 1
                    )))
                }
            };
            if transactions.len() != support {
                return Err(LampError::Engine(format!(
                    "itemset on line {} reports support {} but lists {} transactions",
                    index + 1,
                    support,
                    transactions.len()
                )));
            }
            if transactions.iter().any(|&id| id >= self.total) {
                return Err(LampError::Engine(format!(
                    "itemset on line {} references a transaction beyond {}",
                    index + 1,
                    self.total
                )));
            }
            if support >= min_support {
                lattice.push(Combination::new(items, transactions));
            }
        }
        Ok(lattice)
    }
}

fn parse_ids(line: &str, line_no: usize) -> Result<Vec<usize>> {
    let mut ids = line
        .split_whitespace()
        .map(|s| s.parse::<usize>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| LampError::Engine(format!("bad transaction id on line {}", line_no)))?;
    ids.sort_unstable();
    Ok(ids)
}

impl ItemsetMiner for ExternalLcm {
    fn name(&self) -> &'static str {
        "external-lcm"
    }

    fn enumerate(&mut self, min_support: usize, arity: ArityLimit) -> Result<Lattice> {
        let min_support = min_support.max(1);
        let output = NamedTempFile::new().map_err(|e| LampError::io(std::env::temp_dir(), e))?;
        let args = Self::arguments(min_support, arity, self.input.path(), output.path());
        debug!(program = %self.program.display(), ?args, "running external miner");
        self.run(&args)?;
        let text = fs::read_to_string(output.path()).map_err(|e| LampError::io(output.path(), e))?;
        self.parse_output(&text, min_support)
    }
}

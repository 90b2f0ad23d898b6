//! Itemset mining
//!
//! An [`ItemsetMiner`] enumerates every itemset whose support reaches a
//! minimum, grouped by exact support, together with the ids of the
//! transactions containing it. The rest of the crate relies only on that
//! contract: counts are monotone in the minimum support and every itemset
//! appears in exactly one support level.
//!
//! [`SupportLattice`] wraps one miner for the length of a run. It re-mines
//! only when a level below what it already holds is requested, hands out
//! levels as shared slices, and keeps the per-support bound table.

pub mod external;
pub mod lcm;


use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::error::{LampError, Result};
use crate::stats::SignificanceTest;

pub use external::ExternalLcm;
pub use lcm::LcmMiner;

/// Largest itemset size the miner enumerates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArityLimit {
    /// Closed itemsets of any size
    #[default]
    Unlimited,
    /// All itemsets with at most this many items
    AtMost(usize),
}

impl ArityLimit {
    /// A limit covering every item behaves as unlimited
    pub fn normalized(self, item_count: usize) -> Self {
        match self {
            ArityLimit::AtMost(n) if n >= item_count => ArityLimit::Unlimited,
            other => other,
        }
    }

    pub fn allows(self, size: usize) -> bool {
        match self {
            ArityLimit::Unlimited => true,
            ArityLimit::AtMost(n) => size <= n,
        }
    }
}

impl fmt::Display for ArityLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArityLimit::Unlimited => f.write_str("all"),
            ArityLimit::AtMost(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for ArityLimit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(ArityLimit::Unlimited);
        }
        match s.parse::<usize>() {
            Ok(0) => Err("arity limit must be at least 1".to_string()),
            Ok(n) => Ok(ArityLimit::AtMost(n)),
            Err(_) => Err(format!(
                "invalid arity limit '{}': expected 'all' or a positive integer",
                s
            )),
        }
    }
}

impl Serialize for ArityLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ArityLimit::Unlimited => serializer.serialize_str("all"),
            ArityLimit::AtMost(n) => serializer.serialize_u64(*n as u64),
        }
    }
}

impl<'de> Deserialize<'de> for ArityLimit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u64),
            Text(String),
        }
        let text = match Raw::deserialize(deserializer)? {
            Raw::Count(n) => n.to_string(),
            Raw::Text(s) => s,
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// One itemset and the transactions containing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    /// 1-based item ids, ascending
    pub items: Vec<usize>,
    /// Transaction ids, ascending
    pub transactions: Vec<usize>,
}

impl Combination {
    pub fn new(items: Vec<usize>, transactions: Vec<usize>) -> Self {
        Self {
            items,
            transactions,
        }
    }

    pub fn support(&self) -> usize {
        self.transactions.len()
    }

    pub fn arity(&self) -> usize {
        self.items.len()
    }
}

/// Itemsets grouped by exact support, complete down to `min_support`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lattice {
    min_support: usize,
    levels: BTreeMap<usize, Vec<Combination>>,
}

impl Lattice {
    pub fn new(min_support: usize) -> Self {
        Self {
            min_support,
            levels: BTreeMap::new(),
        }
    }

    pub fn min_support(&self) -> usize {
        self.min_support
    }

    pub fn push(&mut self, combination: Combination) {
        self.levels
            .entry(combination.support())
            .or_default()
            .push(combination);
    }

    pub fn level(&self, support: usize) -> &[Combination] {
        self.levels.get(&support).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Itemsets with support >= `support`
    pub fn count_at_least(&self, support: usize) -> usize {
        self.levels.range(support..).map(|(_, level)| level.len()).sum()
    }

    pub fn max_support(&self) -> Option<usize> {
        self.levels.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.levels.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combination> {
        self.levels.values().rev().flatten()
    }
}

/// Inputs of a delegated lambda search
pub struct LambdaRequest<'a> {
    /// Significance level being distributed over the tests
    pub budget: f64,
    /// Largest support the search may settle on
    pub max_lambda: usize,
    pub arity: ArityLimit,
    /// Minimum attainable significance level by support
    pub bound: &'a dyn Fn(usize) -> f64,
}

/// The mining-engine contract
pub trait ItemsetMiner: Send {
    fn name(&self) -> &'static str;

    /// Every itemset with support >= `min_support`, grouped by support
    fn enumerate(&mut self, min_support: usize, arity: ArityLimit) -> Result<Lattice>;

    /// Smallest admissible support threshold for `request`
    ///
    /// Engines that can interleave the support-lowering loop with their own
    /// enumeration override this; the default re-mines once per candidate.
    fn depth_first_lambda(&mut self, request: &LambdaRequest<'_>) -> Result<usize> {
        crate::search::descend_with_counts(
            request.max_lambda,
            request.budget,
            request.bound,
            |support| Ok(self.enumerate(support, request.arity)?.count_at_least(support)),
        )
    }
}

/// Cached bound and itemset count for one support level
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundEntry {
    pub bound: Option<f64>,
    pub count: Option<usize>,
}

/// Bounds and counts for every support level visited in a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupportBoundTable {
    entries: BTreeMap<usize, BoundEntry>,
}

impl SupportBoundTable {
    pub fn get(&self, support: usize) -> Option<BoundEntry> {
        self.entries.get(&support).copied()
    }

    pub fn record_bound(&mut self, support: usize, bound: f64) {
        self.entries.entry(support).or_default().bound = Some(bound);
    }

    pub fn record_count(&mut self, support: usize, count: usize) {
        self.entries.entry(support).or_default().count = Some(count);
    }

    /// Fail when f(support) > f(support - 1)
    pub fn check_monotone(&self, support: usize) -> Result<()> {
        let upper = self.get(support).and_then(|e| e.bound);
        let lower = support
            .checked_sub(1)
            .and_then(|s| self.get(s))
            .and_then(|e| e.bound);
        match (upper, lower) {
            (Some(upper), Some(lower)) if upper > lower => Err(LampError::BoundViolation {
                lambda: support,
                upper,
                lower,
            }),
            _ => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct MinedLevels {
    floor: usize,
    levels: BTreeMap<usize, Arc<[Combination]>>,
}

struct LatticeState {
    miner: Box<dyn ItemsetMiner>,
    mined: Option<MinedLevels>,
    bounds: SupportBoundTable,
    mining_calls: usize,
}

impl LatticeState {
    fn ensure(&mut self, min_support: usize, arity: ArityLimit) -> Result<&MinedLevels> {
        let min_support = min_support.max(1);
        let covered = matches!(&self.mined, Some(m) if m.floor <= min_support);
        if !covered {
            let started = Instant::now();
            let lattice = self.miner.enumerate(min_support, arity)?;
            self.mining_calls += 1;
            debug!(
                engine = self.miner.name(),
                min_support,
                %arity,
                itemsets = lattice.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "mined itemsets"
            );
            let levels = lattice
                .levels
                .into_iter()
                .map(|(support, level)| (support, Arc::from(level)))
                .collect();
            self.mined = Some(MinedLevels {
                floor: min_support,
                levels,
            });
        }
        self.mined
            .as_ref()
            .ok_or_else(|| LampError::Engine("lattice not mined".to_string()))
    }
}

/// The itemset lattice of one run, mined lazily from the top down
pub struct SupportLattice {
    arity: ArityLimit,
    state: Mutex<LatticeState>,
}

impl SupportLattice {
    pub fn new(miner: Box<dyn ItemsetMiner>, arity: ArityLimit) -> Self {
        Self {
            arity,
            state: Mutex::new(LatticeState {
                miner,
                mined: None,
                bounds: SupportBoundTable::default(),
                mining_calls: 0,
            }),
        }
    }

    pub fn arity(&self) -> ArityLimit {
        self.arity
    }

    fn lock(&self) -> Result<MutexGuard<'_, LatticeState>> {
        self.state
            .lock()
            .map_err(|_| LampError::Engine("lattice lock poisoned".to_string()))
    }

    pub fn engine_name(&self) -> Result<&'static str> {
        Ok(self.lock()?.miner.name())
    }

    /// Mine down to `min_support` unless already covered
    pub fn ensure(&self, min_support: usize) -> Result<()> {
        self.lock()?.ensure(min_support, self.arity).map(|_| ())
    }

    /// Itemsets with exactly `support` matching transactions
    pub fn level(&self, support: usize) -> Result<Arc<[Combination]>> {
        let mut state = self.lock()?;
        let mined = state.ensure(support, self.arity)?;
        Ok(mined
            .levels
            .get(&support)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new())))
    }

    /// Itemsets with support >= `support`
    pub fn count_at_least(&self, support: usize) -> Result<usize> {
        let mut state = self.lock()?;
        let count: usize = state
            .ensure(support, self.arity)?
            .levels
            .range(support.max(1)..)
            .map(|(_, level)| level.len())
            .sum();
        state.bounds.record_count(support, count);
        Ok(count)
    }

    /// Largest support among the itemsets mined so far
    pub fn max_support(&self) -> Result<Option<usize>> {
        let state = self.lock()?;
        Ok(state
            .mined
            .as_ref()
            .and_then(|m| m.levels.keys().next_back().copied()))
    }

    /// Minimum attainable significance level at `support`, memoized
    ///
    /// The bound depends only on the support and the engine's marginals,
    /// which permutations leave untouched, so one table serves every trial.
    pub fn bound(&self, support: usize, engine: &dyn SignificanceTest) -> Result<f64> {
        let mut state = self.lock()?;
        if let Some(bound) = state.bounds.get(support).and_then(|e| e.bound) {
            return Ok(bound);
        }
        let bound = engine.bound(support);
        state.bounds.record_bound(support, bound);
        Ok(bound)
    }

    /// f(support) and f(support - 1), failing if they are out of order
    pub fn bound_pair(&self, support: usize, engine: &dyn SignificanceTest) -> Result<(f64, f64)> {
        let upper = self.bound(support, engine)?;
        let lower = self.bound(support.saturating_sub(1), engine)?;
        self.lock()?.bounds.check_monotone(support)?;
        Ok((upper, lower))
    }

    /// Run the miner's own lambda search
    pub fn depth_first_lambda(
        &self,
        budget: f64,
        max_lambda: usize,
        engine: &dyn SignificanceTest,
    ) -> Result<usize> {
        let bound = |support: usize| engine.bound(support);
        let request = LambdaRequest {
            budget,
            max_lambda,
            arity: self.arity,
            bound: &bound,
        };
        let mut state = self.lock()?;
        state.mining_calls += 1;
        state.miner.depth_first_lambda(&request)
    }

    pub fn bound_table(&self) -> Result<SupportBoundTable> {
        Ok(self.lock()?.bounds.clone())
    }

    /// Number of enumerations run so far
    pub fn mining_calls(&self) -> Result<usize> {
        Ok(self.lock()?.mining_calls)
    }
}

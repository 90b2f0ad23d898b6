//! In-memory transaction store
//!
//! One [`Transaction`] per sample: the set of items present for it and its
//! outcome value. The store keeps transactions sorted ascending by value and
//! uses the position in that order as the transaction id, so the rank-based
//! engine and the miners agree on ids without any remapping.

use fnv::FnvHashMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{LampError, Result};

/// One sample: its name, the items present for it and its outcome value
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Position in the value-sorted store
    pub id: usize,
    pub name: String,
    /// 1-based item ids, ascending
    pub itemset: Vec<usize>,
    pub value: f64,
}

impl Transaction {
    pub fn new(name: impl Into<String>, itemset: Vec<usize>, value: f64) -> Self {
        let mut itemset = itemset;
        itemset.sort_unstable();
        itemset.dedup();
        Self {
            id: 0,
            name: name.into(),
            itemset,
            value,
        }
    }

    pub fn contains(&self, item: usize) -> bool {
        self.itemset.binary_search(&item).is_ok()
    }
}

/// Item names in column order; item id = index + 1
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMapping {
    names: Vec<String>,
}

impl ColumnMapping {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, item: usize) -> Option<&str> {
        item.checked_sub(1)
            .and_then(|index| self.names.get(index))
            .map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Name -> id dictionary, built on demand
    pub fn index(&self) -> FnvHashMap<&str, usize> {
        self.names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.as_str(), index + 1))
            .collect()
    }

    /// Names of the given items, in the given order
    pub fn describe(&self, items: &[usize]) -> Vec<String> {
        items
            .iter()
            .map(|&item| {
                self.name(item)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("#{}", item))
            })
            .collect()
    }

    /// Resolve item names to ids, failing on the first unknown name
    pub fn resolve(&self, names: &[&str]) -> Result<Vec<usize>> {
        let index = self.index();
        let mut items = names
            .iter()
            .map(|name| {
                index.get(name.trim()).copied().ok_or_else(|| {
                    LampError::Configuration(format!("unknown item name '{}'", name.trim()))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        items.sort_unstable();
        items.dedup();
        Ok(items)
    }
}

/// All transactions of one run plus the item column mapping
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionStore {
    transactions: Vec<Transaction>,
    columns: ColumnMapping,
}

impl TransactionStore {
    /// Build a store, sorting transactions ascending by value
    ///
    /// The sort is stable, so samples with equal values keep their input
    /// order. Ids are reassigned to the sorted positions.
    pub fn new(transactions: Vec<Transaction>, columns: ColumnMapping) -> Self {
        let mut store = Self {
            transactions,
            columns,
        };
        store.sort_by_value();
        store
    }

    fn sort_by_value(&mut self) {
        self.transactions
            .sort_by(|a, b| a.value.total_cmp(&b.value));
        for (position, transaction) in self.transactions.iter_mut().enumerate() {
            transaction.id = position;
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn columns(&self) -> &ColumnMapping {
        &self.columns
    }

    pub fn item_count(&self) -> usize {
        self.columns.len()
    }

    /// Outcome values in id order
    pub fn values(&self) -> Vec<f64> {
        self.transactions.iter().map(|t| t.value).collect()
    }

    /// Itemsets in id order
    pub fn itemsets(&self) -> Vec<Vec<usize>> {
        self.transactions.iter().map(|t| t.itemset.clone()).collect()
    }

    /// Number of transactions containing each item, indexed by item id - 1
    pub fn item_supports(&self) -> Vec<usize> {
        let mut supports = vec![0; self.columns.len()];
        for transaction in &self.transactions {
            for &item in &transaction.itemset {
                if let Some(count) = item.checked_sub(1).and_then(|i| supports.get_mut(i)) {
                    *count += 1;
                }
            }
        }
        supports
    }

    /// Ids of the transactions containing every given item
    pub fn matching(&self, items: &[usize]) -> Vec<usize> {
        self.transactions
            .iter()
            .filter(|t| items.iter().all(|&item| t.contains(item)))
            .map(|t| t.id)
            .collect()
    }

    /// Number of transactions with value 1
    pub fn positive_count(&self) -> usize {
        self.transactions.iter().filter(|t| t.value == 1.0).count()
    }

    /// Fail unless every value is 0 or 1
    pub fn ensure_binary(&self) -> Result<()> {
        match self
            .transactions
            .iter()
            .find(|t| t.value != 0.0 && t.value != 1.0)
        {
            Some(t) => Err(LampError::Configuration(format!(
                "sample '{}' has value {} but the test requires 0 or 1",
                t.name, t.value
            ))),
            None => Ok(()),
        }
    }

    /// Flip the hypothesis direction of every value
    ///
    /// Binary values become `1 - v`, continuous values `-v`. The store is
    /// re-sorted afterwards, so ids change.
    pub fn invert_values(&mut self, binary: bool) {
        for transaction in &mut self.transactions {
            transaction.value = if binary {
                1.0 - transaction.value
            } else {
                -transaction.value
            };
        }
        self.transactions.reverse();
        self.sort_by_value();
    }
}

/// Values of `values` reordered by a seeded shuffle
///
/// Itemsets stay with their transactions; only the outcome assigned to each
/// id is redrawn. The same seed always yields the same permutation.
pub fn permuted_values(values: &[f64], seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut permuted = values.to_vec();
    permuted.shuffle(&mut rng);
    permuted
}

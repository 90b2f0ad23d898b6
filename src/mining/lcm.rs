//! In-process LCM-style miner
//!
//! Unlimited arity enumerates closed itemsets by prefix-preserving closure
//! extension, starting from the closure of the full transaction set (the
//! empty itemset unless some item is present everywhere). A finite arity
//! enumerates every itemset of at most that many items, the empty itemset
//! included.
//!
//! Both walks report through a [`Collector`] whose minimum support may rise
//! during the walk; the depth-first lambda search uses that to prune as soon
//! as the partial counts rule a support level out.

use tracing::debug;

use super::{ArityLimit, Combination, ItemsetMiner, LambdaRequest, Lattice};
use crate::error::Result;
use crate::search;
use crate::transaction::TransactionStore;

trait Collector {
    /// Current minimum support; never decreases during a walk
    fn min_support(&self) -> usize;

    fn collect(&mut self, items: &[usize], transactions: &[usize]);
}

struct LatticeCollector {
    lattice: Lattice,
}

impl Collector for LatticeCollector {
    fn min_support(&self) -> usize {
        self.lattice.min_support()
    }

    fn collect(&mut self, items: &[usize], transactions: &[usize]) {
        self.lattice
            .push(Combination::new(items.to_vec(), transactions.to_vec()));
    }
}

/// Support histogram that raises lambda while the walk is running
struct LambdaHistogram<'a> {
    request: &'a LambdaRequest<'a>,
    /// Itemsets per exact support
    counts: Vec<usize>,
    lambda: usize,
    /// Itemsets with support >= lambda + 1
    above: usize,
}

impl<'a> LambdaHistogram<'a> {
    fn new(request: &'a LambdaRequest<'a>, total: usize) -> Self {
        Self {
            request,
            counts: vec![0; total + 1],
            lambda: 1,
            above: 0,
        }
    }

    fn raise(&mut self) {
        while self.lambda < self.request.max_lambda {
            let next = self.lambda + 1;
            let lower = (self.request.bound)(self.lambda);
            if self.above < search::admissible_bottom(self.request.budget, lower) {
                break;
            }
            self.lambda = next;
            self.above -= self.counts.get(next).copied().unwrap_or(0);
        }
    }

    fn count_at_least(&self, support: usize) -> usize {
        self.counts.iter().skip(support).sum()
    }
}

impl Collector for LambdaHistogram<'_> {
    fn min_support(&self) -> usize {
        self.lambda
    }

    fn collect(&mut self, _items: &[usize], transactions: &[usize]) {
        let support = transactions.len();
        if let Some(count) = self.counts.get_mut(support) {
            *count += 1;
        }
        if support > self.lambda {
            self.above += 1;
            self.raise();
        }
    }
}

/// In-process miner over the itemsets of a transaction store
#[derive(Debug, Clone)]
pub struct LcmMiner {
    itemsets: Vec<Vec<usize>>,
    /// Ascending transaction ids per item, indexed by item id - 1
    occurrences: Vec<Vec<usize>>,
}

fn intersect(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

impl LcmMiner {
    pub fn new(store: &TransactionStore) -> Self {
        Self::from_itemsets(store.item_count(), store.itemsets())
    }

    /// Miner over `itemsets[id]` with item ids in `1..=item_count`
    pub fn from_itemsets(item_count: usize, itemsets: Vec<Vec<usize>>) -> Self {
        let mut occurrences = vec![Vec::new(); item_count];
        let itemsets: Vec<Vec<usize>> = itemsets
            .into_iter()
            .map(|mut items| {
                items.retain(|&item| item >= 1 && item <= item_count);
                items.sort_unstable();
                items.dedup();
                items
            })
            .collect();
        for (id, items) in itemsets.iter().enumerate() {
            for &item in items {
                occurrences[item - 1].push(id);
            }
        }
        Self {
            itemsets,
            occurrences,
        }
    }

    fn total(&self) -> usize {
        self.itemsets.len()
    }

    fn item_count(&self) -> usize {
        self.occurrences.len()
    }

    /// Items shared by every transaction in `transactions`
    fn closure(&self, transactions: &[usize]) -> Vec<usize> {
        let Some((&first, rest)) = transactions.split_first() else {
            return (1..=self.item_count()).collect();
        };
        let mut items = self.itemsets[first].clone();
        for &id in rest {
            let other = &self.itemsets[id];
            items.retain(|item| other.binary_search(item).is_ok());
            if items.is_empty() {
                break;
            }
        }
        items
    }

    fn walk<C: Collector>(&self, arity: ArityLimit, collector: &mut C) {
        let all: Vec<usize> = (0..self.total()).collect();
        if all.len() < collector.min_support().max(1) {
            return;
        }
        match arity {
            ArityLimit::Unlimited => {
                let root = self.closure(&all);
                collector.collect(&root, &all);
                self.expand_closed(&root, &all, 0, collector);
            }
            ArityLimit::AtMost(limit) => {
                collector.collect(&[], &all);
                self.expand_frequent(&mut Vec::new(), &all, 0, limit, collector);
            }
        }
    }

    fn expand_closed<C: Collector>(
        &self,
        prefix: &[usize],
        transactions: &[usize],
        core: usize,
        collector: &mut C,
    ) {
        for item in core + 1..=self.item_count() {
            if prefix.binary_search(&item).is_ok() {
                continue;
            }
            let matching = intersect(transactions, &self.occurrences[item - 1]);
            if matching.len() < collector.min_support().max(1) {
                continue;
            }
            let closed = self.closure(&matching);
            let preserves_prefix = closed
                .iter()
                .take_while(|&&i| i < item)
                .eq(prefix.iter().take_while(|&&i| i < item));
            if !preserves_prefix {
                continue;
            }
            collector.collect(&closed, &matching);
            self.expand_closed(&closed, &matching, item, collector);
        }
    }

    fn expand_frequent<C: Collector>(
        &self,
        prefix: &mut Vec<usize>,
        transactions: &[usize],
        last: usize,
        limit: usize,
        collector: &mut C,
    ) {
        if prefix.len() >= limit {
            return;
        }
        for item in last + 1..=self.item_count() {
            let matching = intersect(transactions, &self.occurrences[item - 1]);
            if matching.len() < collector.min_support().max(1) {
                continue;
            }
            prefix.push(item);
            collector.collect(prefix, &matching);
            self.expand_frequent(prefix, &matching, item, limit, collector);
            prefix.pop();
        }
    }
}

impl ItemsetMiner for LcmMiner {
    fn name(&self) -> &'static str {
        "lcm"
    }

    fn enumerate(&mut self, min_support: usize, arity: ArityLimit) -> Result<Lattice> {
        let mut collector = LatticeCollector {
            lattice: Lattice::new(min_support.max(1)),
        };
        self.walk(arity, &mut collector);
        Ok(collector.lattice)
    }

    fn depth_first_lambda(&mut self, request: &LambdaRequest<'_>) -> Result<usize> {
        let mut histogram = LambdaHistogram::new(request, self.total());
        self.walk(request.arity, &mut histogram);
        debug!(
            raised_to = histogram.lambda,
            itemsets = histogram.count_at_least(histogram.lambda),
            "depth-first walk finished"
        );
        let floor = histogram.lambda;
        search::descend_with_counts(
            request.max_lambda,
            request.budget,
            request.bound,
            |support| Ok(histogram.count_at_least(support.max(floor))),
        )
    }
}

//! Memo table keyed by (support, positive count)
//!
//! Conceptually triangular: row `x` holds entries for `0 <= a <= x`. Rows are
//! allocated on first use so wide datasets only pay for the supports that are
//! actually tested. Keys outside the table are not cached.

#[derive(Debug, Clone, Default)]
pub struct PValueTable {
    rows: Vec<Option<Box<[Option<f64>]>>>,
}

impl PValueTable {
    /// Table covering supports `0..=max_support`
    pub fn new(max_support: usize) -> Self {
        Self {
            rows: vec![None; max_support + 1],
        }
    }

    pub fn get(&self, x: usize, a: usize) -> Option<f64> {
        self.rows
            .get(x)?
            .as_ref()?
            .get(a)
            .copied()
            .flatten()
    }

    pub fn insert(&mut self, x: usize, a: usize, value: f64) {
        if a > x {
            return;
        }
        if let Some(row) = self.rows.get_mut(x) {
            let row = row.get_or_insert_with(|| vec![None; x + 1].into_boxed_slice());
            row[a] = Some(value);
        }
    }

    /// Cached value for (x, a), computing and storing it when absent
    pub fn get_or_insert_with(&mut self, x: usize, a: usize, compute: impl FnOnce() -> f64) -> f64 {
        if let Some(value) = self.get(x, a) {
            return value;
        }
        let value = compute();
        self.insert(x, a, value);
        value
    }

    /// Number of memoized entries
    pub fn len(&self) -> usize {
        self.rows
            .iter()
            .flatten()
            .map(|row| row.iter().filter(|v| v.is_some()).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Distribution helpers shared by the test engines

use std::f64::consts::SQRT_2;

use statrs::function::erf::erfc;
use statrs::function::factorial::ln_binomial;

/// P(Z > z) for a standard normal Z
pub fn normal_upper_tail(z: f64) -> f64 {
    0.5 * erfc(z / SQRT_2)
}

/// ln C(n, k); negative infinity when k > n
pub fn ln_choose(n: usize, k: usize) -> f64 {
    if k > n {
        f64::NEG_INFINITY
    } else {
        ln_binomial(n as u64, k as u64)
    }
}

/// C(n, k) / C(total, k), the chance that k draws all land in a group of n
pub fn choose_ratio(n: usize, total: usize, k: usize) -> f64 {
    if k > n || k > total {
        return 0.0;
    }
    (ln_choose(n, k) - ln_choose(total, k)).exp()
}

/// Hypergeometric distribution of positives among `draws` samples taken
/// from `total` samples of which `successes` are positive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hypergeometric {
    pub total: usize,
    pub successes: usize,
    pub draws: usize,
}

impl Hypergeometric {
    pub fn new(total: usize, successes: usize, draws: usize) -> Self {
        Self {
            total,
            successes: successes.min(total),
            draws: draws.min(total),
        }
    }

    /// Smallest feasible positive count
    pub fn min_k(&self) -> usize {
        self.draws
            .saturating_sub(self.total - self.successes)
    }

    /// Largest feasible positive count
    pub fn max_k(&self) -> usize {
        self.draws.min(self.successes)
    }

    pub fn ln_pmf(&self, k: usize) -> f64 {
        if k < self.min_k() || k > self.max_k() {
            return f64::NEG_INFINITY;
        }
        ln_choose(self.successes, k) + ln_choose(self.total - self.successes, self.draws - k)
            - ln_choose(self.total, self.draws)
    }

    pub fn pmf(&self, k: usize) -> f64 {
        self.ln_pmf(k).exp()
    }

    /// P(X >= k)
    pub fn upper_tail(&self, k: usize) -> f64 {
        if k <= self.min_k() {
            return 1.0;
        }
        let tail: f64 = (k..=self.max_k()).map(|i| self.pmf(i)).sum();
        tail.min(1.0)
    }
}

//! Support-lowering scan
//!
//! The lambda search, the FWER enumeration and every FastWY trial walk the
//! lattice the same way: start at some support, hand every itemset at that
//! exact support to a visitor, then ask the visitor whether to stop. Support
//! only ever decreases and no level is visited twice.
//!
//! ```text
//! Descending --Step::Descend--> Descending   (support - 1)
//! Descending --Step::Accept---> Accepted
//! Descending --support == 1---> Exhausted
//! ```

use serde::Serialize;

use crate::error::Result;
use crate::mining::{Combination, SupportLattice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Descending,
    Accepted,
    Exhausted,
}

/// Visitor decision after a support level has been visited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Descend,
    /// Stop, settling on the given support
    Accept(usize),
}

pub trait LevelVisitor {
    /// Called once for every itemset at `support`
    fn visit(&mut self, support: usize, combination: &Combination) -> Result<()>;

    /// Called after the last itemset at `support`
    fn after_level(&mut self, support: usize) -> Result<Step>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    pub state: ScanState,
    /// Accepted support, or 1 when exhausted
    pub support: usize,
    pub levels: usize,
    pub combinations: usize,
}

/// Walk from `top` down until the visitor accepts or support 1 is done
pub fn lower_support<V>(lattice: &SupportLattice, top: usize, visitor: &mut V) -> Result<ScanOutcome>
where
    V: LevelVisitor + ?Sized,
{
    let mut outcome = ScanOutcome {
        state: ScanState::Descending,
        support: top.max(1),
        levels: 0,
        combinations: 0,
    };

    while outcome.state == ScanState::Descending {
        let support = outcome.support;
        let level = lattice.level(support)?;
        for combination in level.iter() {
            visitor.visit(support, combination)?;
        }
        outcome.levels += 1;
        outcome.combinations += level.len();

        match visitor.after_level(support)? {
            Step::Accept(accepted) => {
                outcome.state = ScanState::Accepted;
                outcome.support = accepted;
            }
            Step::Descend if support <= 1 => outcome.state = ScanState::Exhausted,
            Step::Descend => outcome.support = support - 1,
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mining::{ArityLimit, LcmMiner};

    struct Recorder {
        visited: Vec<(usize, Vec<usize>)>,
        levels: Vec<usize>,
        stop_at: Option<usize>,
    }

    impl LevelVisitor for Recorder {
        fn visit(&mut self, support: usize, combination: &Combination) -> Result<()> {
            self.visited.push((support, combination.items.clone()));
            Ok(())
        }

        fn after_level(&mut self, support: usize) -> Result<Step> {
            self.levels.push(support);
            Ok(match self.stop_at {
                Some(stop) if support <= stop => Step::Accept(support),
                _ => Step::Descend,
            })
        }
    }

    fn lattice() -> SupportLattice {
        let miner = LcmMiner::from_itemsets(
            3,
            vec![vec![1, 2], vec![1, 2], vec![1], vec![3], vec![]],
        );
        SupportLattice::new(Box::new(miner), ArityLimit::Unlimited)
    }

    #[test]
    fn test_exhausts_at_one() {
        let lattice = lattice();
        let mut recorder = Recorder {
            visited: Vec::new(),
            levels: Vec::new(),
            stop_at: None,
        };
        let outcome = lower_support(&lattice, 5, &mut recorder).unwrap();
        assert_eq!(outcome.state, ScanState::Exhausted);
        assert_eq!(outcome.support, 1);
        assert_eq!(recorder.levels, vec![5, 4, 3, 2, 1]);
        assert_eq!(outcome.combinations, 4);
        assert_eq!(
            recorder.visited,
            vec![(5, vec![]), (3, vec![1]), (2, vec![1, 2]), (1, vec![3])]
        );
    }

    #[test]
    fn test_accepts_and_stops_descending() {
        let lattice = lattice();
        let mut recorder = Recorder {
            visited: Vec::new(),
            levels: Vec::new(),
            stop_at: Some(3),
        };
        let outcome = lower_support(&lattice, 5, &mut recorder).unwrap();
        assert_eq!(outcome.state, ScanState::Accepted);
        assert_eq!(outcome.support, 3);
        assert_eq!(outcome.levels, 3);
        assert_eq!(recorder.levels, vec![5, 4, 3]);
    }

    #[test]
    fn test_top_zero_starts_at_one() {
        let lattice = lattice();
        let mut recorder = Recorder {
            visited: Vec::new(),
            levels: Vec::new(),
            stop_at: None,
        };
        let outcome = lower_support(&lattice, 0, &mut recorder).unwrap();
        assert_eq!(recorder.levels, vec![1]);
        assert_eq!(outcome.state, ScanState::Exhausted);
    }
}

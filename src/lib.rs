//! LAMP - significant itemset combinations with family-wise error control
//!
//! Given binary item-presence data and an outcome per sample, this library
//! finds the itemsets associated with the outcome while controlling the
//! family-wise error rate over all itemsets tested:
//!
//! - [`search`] picks the minimum support lambda* whose itemset count k keeps
//!   `alpha / k` above the smallest p-value any itemset of that support can
//!   reach;
//! - [`fwer`] tests every itemset at or above lambda* against `alpha / k`;
//! - [`fastwy`] calibrates a less conservative threshold from permuted data.
//!
//! P-values come from Fisher's exact test, a Yates-corrected chi-square test
//! or the Mann-Whitney U test ([`stats`]); itemsets from an in-process
//! LCM-style miner or an external LCM binary ([`mining`]).

pub mod cli;
pub mod config;
pub mod csv_output;
pub mod error;
pub mod fastwy;
pub mod fwer;
pub mod json_output;
pub mod mining;
pub mod pipeline;
pub mod reader;
pub mod redundancy;
pub mod scan;
pub mod search;
pub mod stats;
pub mod text_output;
pub mod transaction;

pub use error::{LampError, Result};

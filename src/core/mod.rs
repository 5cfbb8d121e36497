//! Core sampling-tree implementation.
//!
//! This module is the pure Rust data structure; the `PyO3` bindings in the
//! crate root are a thin layer on top of it so everything here can be tested
//! standalone.
//!
//! # Structure
//!
//! - [`LeafStore`]: the four jump weights and caller id of every atom, kept
//!   dense by position
//! - [`PartialSumTree`]: one flat array of subtree totals over atom positions,
//!   with the grand total at the root
//! - [`Selection`]: the `(position, jump_id)` result of a draw, retained by the
//!   tree as the target of the next update or removal
//!
//! A draw scales the caller's uniform `xi` by the total weight and walks the
//! partial sums from the root down, then scans the four slots of the atom it
//! reaches. Updates and removals repair the sums on the path back to the root.

// Allow some pedantic lints that are not applicable for this numerical code
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod leaf;
pub mod sampler;
pub mod selection;
pub mod stats;
pub mod sum_tree;
pub mod tree;

pub use config::TreeConfig;
pub use error::{Result, TreeError};
pub use leaf::{Kappa, LeafStore};
pub use sampler::{sample, sample_n, slot_counts};
pub use selection::Selection;
pub use stats::{chi_squared_from_counts, chi_squared_sf, pearson_correlation, ChiSquaredResult};
pub use sum_tree::PartialSumTree;
pub use tree::SamplingTree;

/// Number of jump weights carried by every atom.
pub const JUMP_COUNT: usize = 4;

/// Flatten per-atom weight rows into a single `position * 4 + jump_id` vector.
#[must_use]
pub fn flatten_kappa(rows: &[Kappa]) -> Vec<f64> {
    rows.iter().flatten().copied().collect()
}

/// Normalize weights so they sum to one.
///
/// Returns all zeros when the weights sum to zero.
#[must_use]
pub fn normalize(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return vec![0.0; weights.len()];
    }
    weights.iter().map(|w| w / total).collect()
}

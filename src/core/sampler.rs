//! Drawing events with a caller-owned random number generator.
//!
//! The tree itself only ever consumes a uniform value `xi`. These helpers take
//! that value from an [`Rng`] the caller owns, so seeding and reproducibility
//! stay entirely with the caller.

use rand::Rng;

use crate::core::{Result, SamplingTree, Selection};

/// Draw one event, taking `xi` uniformly from `[0, 1)` out of `rng`.
///
/// # Errors
///
/// [`TreeError::EmptyTree`](crate::core::TreeError::EmptyTree) if the tree
/// has no weight to draw from.
pub fn sample<I, R: Rng>(tree: &mut SamplingTree<I>, rng: &mut R) -> Result<Selection> {
    let xi: f64 = rng.gen();
    tree.choose_event(xi)
}

/// Draw `n` events without modifying any weights.
///
/// Every draw overwrites the tree's current selection; the last one stays
/// current afterwards.
///
/// # Errors
///
/// Fails on the first draw that fails (only possible for an empty tree).
pub fn sample_n<I, R: Rng>(
    tree: &mut SamplingTree<I>,
    n: usize,
    rng: &mut R,
) -> Result<Vec<Selection>> {
    (0..n).map(|_| sample(tree, rng)).collect()
}

/// Count how often each flattened `position * 4 + jump_id` slot is drawn.
///
/// # Errors
///
/// Fails if the tree is empty.
pub fn slot_counts<I, R: Rng>(
    tree: &mut SamplingTree<I>,
    n: usize,
    rng: &mut R,
) -> Result<Vec<u64>> {
    let mut counts = vec![0_u64; tree.len() * crate::core::JUMP_COUNT];
    for _ in 0..n {
        counts[sample(tree, rng)?.flat_index()] += 1;
    }
    Ok(counts)
}

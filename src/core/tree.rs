//! The sampling tree: leaf storage, partial sums and the selection context.
//!
//! Typical use in a kinetic Monte Carlo loop:
//!
//! ```
//! use kappa_tree::core::SamplingTree;
//!
//! let mut tree = SamplingTree::new();
//! tree.append(&[[1.0, 0.0, 2.0, 0.5], [0.0, 3.0, 0.0, 0.0]], [7_u32, 9])?;
//!
//! tree.choose_event(0.6)?;
//! let (atom, jump) = (*tree.get_index()?, tree.get_jump_id()?);
//! assert_eq!((atom, jump), (9, 1));
//!
//! tree.update_kappa(&[0.0, 1.0, 0.0, 1.0])?;
//! assert!((tree.get_kappa() - 5.5).abs() < 1e-12);
//! # Ok::<(), kappa_tree::core::TreeError>(())
//! ```

use tracing::{debug, trace, warn};

use crate::core::leaf::{kappa_total, select_slot, validate_kappa, Kappa, LeafStore};
use crate::core::{PartialSumTree, Result, Selection, TreeConfig, TreeError};

/// Dynamic weighted sampler over atoms with four jump weights each.
///
/// Draws, appends, updates and removals all run in O(log n); the grand total
/// is read in O(1). Randomness is never generated internally: every draw is
/// driven by a caller-supplied uniform value, so a given tree state and `xi`
/// always produce the same selection.
#[derive(Debug, Clone)]
pub struct SamplingTree<I> {
    leaves: LeafStore<I>,
    sums: PartialSumTree,
    /// Last successful draw; cleared by `remove`.
    current: Option<Selection>,
    /// Bumped by removals and clears; invalidates older selections.
    epoch: u64,
    config: TreeConfig,
}

impl<I> SamplingTree<I> {
    /// Create an empty tree with the basic configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TreeConfig::basic())
    }

    #[must_use]
    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            leaves: LeafStore::new(),
            sums: PartialSumTree::with_capacity(config.start_capacity()),
            current: None,
            epoch: 0,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Number of live atoms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Number of leaf slots currently allocated in the partial-sum tree.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.sums.capacity()
    }

    /// Number of position-changing mutations (removals and clears) so far.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The selection that `update_kappa` and `remove` will act on, if any.
    #[must_use]
    pub const fn selection(&self) -> Option<Selection> {
        self.current
    }

    /// Total weight over every slot of every atom. Zero for an empty tree.
    #[inline]
    #[must_use]
    pub fn get_kappa(&self) -> f64 {
        if self.leaves.is_empty() {
            0.0
        } else {
            self.sums.total()
        }
    }

    /// Caller id of the atom stored at `position`.
    #[must_use]
    pub fn id_at(&self, position: usize) -> Option<&I> {
        self.leaves.id(position)
    }

    /// Weights of the atom stored at `position`.
    #[must_use]
    pub fn weights_at(&self, position: usize) -> Option<&Kappa> {
        self.leaves.kappa(position)
    }

    /// Id and weights of the atom stored at `position`.
    #[must_use]
    pub fn atom(&self, position: usize) -> Option<(&I, &Kappa)> {
        Some((self.leaves.id(position)?, self.leaves.kappa(position)?))
    }

    /// Iterate over `(id, weights)` in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (&I, &Kappa)> {
        self.leaves.iter()
    }

    // -------------------------------------------------------------------------
    // Append
    // -------------------------------------------------------------------------

    /// Append a batch of atoms at the end of storage, in order.
    ///
    /// Every row is validated before anything is stored, so on error the tree
    /// is unchanged. The current selection stays valid: existing atoms keep
    /// their positions.
    ///
    /// # Errors
    ///
    /// - [`TreeError::DimensionMismatch`] if a row does not have four entries
    ///   or the number of ids differs from the number of rows
    /// - [`TreeError::NegativeWeight`] / [`TreeError::NonFiniteWeight`] for
    ///   invalid entries
    /// - [`TreeError::TotalOverflow`] if the new grand total would not be
    ///   finite
    pub fn append<W, Ids>(&mut self, weights: &[W], ids: Ids) -> Result<()>
    where
        W: AsRef<[f64]>,
        Ids: IntoIterator<Item = I>,
    {
        let ids: Vec<I> = ids.into_iter().collect();
        if ids.len() != weights.len() {
            return Err(TreeError::DimensionMismatch {
                expected: weights.len(),
                actual: ids.len(),
            });
        }
        let kappas = weights
            .iter()
            .map(|row| validate_kappa(row.as_ref()))
            .collect::<Result<Vec<Kappa>>>()?;
        if kappas.is_empty() {
            return Ok(());
        }
        let projected = kappas
            .iter()
            .fold(self.get_kappa(), |total, kappa| total + kappa_total(kappa));
        check_total(projected)?;

        let first = self.leaves.len();
        for (id, kappa) in ids.into_iter().zip(kappas) {
            self.leaves.push(id, kappa);
        }

        let needed = self.leaves.len();
        if needed > self.sums.capacity() {
            // Grow by doubling; the resize copies the old leaves and the new
            // ones are written below, followed by one full rebuild.
            let mut capacity = self.sums.capacity();
            while capacity < needed {
                capacity *= 2;
            }
            self.sums.resize(capacity, first);
        }
        self.sums.set_range(first, &self.leaves.totals_from(first));
        debug!(
            appended = needed - first,
            atoms = needed,
            total = self.sums.total(),
            "appended atoms"
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// Draw an atom and jump id with probability proportional to its weight.
    ///
    /// `xi` must be uniform in `[0, 1)`. The target `xi * total` is located by
    /// a top-down walk over the partial sums and then a scan over the four
    /// slots of the reached atom. Every slot owns the half-open interval
    /// `[cumulative_before, cumulative_before + weight)`, so a target landing
    /// exactly on a boundary belongs to the slot on the right and zero-weight
    /// slots are never picked. If rounding pushes the target past the last
    /// interval, the last slot with non-zero weight is chosen.
    ///
    /// The result becomes the current selection and is also returned.
    ///
    /// # Errors
    ///
    /// - [`TreeError::InvalidDraw`] if `xi` is not in `[0, 1)`
    /// - [`TreeError::EmptyTree`] if there are no atoms or all weights are zero
    pub fn choose_event(&mut self, xi: f64) -> Result<Selection> {
        if !(0.0..1.0).contains(&xi) {
            return Err(TreeError::InvalidDraw(xi));
        }
        if self.leaves.is_empty() {
            return Err(TreeError::EmptyTree);
        }

        let total = self.sums.total();
        let target = xi * total;
        let descent = self.sums.descend(target).ok_or(TreeError::EmptyTree)?;
        let kappa = self
            .leaves
            .kappa(descent.position)
            .ok_or(TreeError::EmptyTree)?;
        let jump_id = select_slot(kappa, descent.remainder).ok_or(TreeError::EmptyTree)?;

        if descent.remainder >= kappa_total(kappa) {
            debug!(
                position = descent.position,
                remainder = descent.remainder,
                "draw fell past the last interval, clamped to last non-zero slot"
            );
        }

        let selection = Selection::new(descent.position, jump_id, self.epoch);
        trace!(xi, target, position = descent.position, jump_id, "chose event");
        self.current = Some(selection);
        Ok(selection)
    }

    /// Caller id of the currently selected atom.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvalidState`] if there is no current selection.
    pub fn get_index(&self) -> Result<&I> {
        let selection = self.current.ok_or(TreeError::InvalidState)?;
        self.leaves
            .id(selection.position())
            .ok_or(TreeError::InvalidState)
    }

    /// Jump id (`0..4`) of the current selection.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvalidState`] if there is no current selection.
    pub fn get_jump_id(&self) -> Result<usize> {
        self.current
            .map(|selection| selection.jump_id())
            .ok_or(TreeError::InvalidState)
    }

    // -------------------------------------------------------------------------
    // Update
    // -------------------------------------------------------------------------

    /// Overwrite all four weights of the currently selected atom.
    ///
    /// The selection remains current afterwards.
    ///
    /// # Errors
    ///
    /// - [`TreeError::InvalidState`] if there is no current selection
    /// - weight validation errors as for [`append`](Self::append)
    pub fn update_kappa(&mut self, weights: &[f64]) -> Result<()> {
        let selection = self.current.ok_or(TreeError::InvalidState)?;
        self.update_selected(&selection, weights)
    }

    /// Overwrite the weights of the atom named by an explicit selection.
    ///
    /// # Errors
    ///
    /// - [`TreeError::StaleSelection`] if atoms were removed since the draw
    /// - weight validation errors as for [`append`](Self::append), including
    ///   [`TreeError::TotalOverflow`] when the new grand total is not finite
    pub fn update_selected(&mut self, selection: &Selection, weights: &[f64]) -> Result<()> {
        self.check_fresh(selection)?;
        let kappa = validate_kappa(weights)?;
        let position = selection.position();
        let old = self.leaves.kappa(position).map_or(0.0, kappa_total);
        check_total(self.get_kappa() - old + kappa_total(&kappa))?;
        if let Some(slot) = self.leaves.kappa_mut(position) {
            *slot = kappa;
        }
        self.sums.set(position, kappa_total(&kappa));
        trace!(position, total = self.sums.total(), "updated kappa");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    /// Remove the currently selected atom and return its id and weights.
    ///
    /// The last atom in storage moves into the freed position. The selection
    /// is consumed: a second `remove` without a new draw fails.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvalidState`] if there is no current selection.
    pub fn remove(&mut self) -> Result<(I, Kappa)> {
        let selection = self.current.ok_or(TreeError::InvalidState)?;
        self.remove_selected(selection)
    }

    /// Remove the atom named by an explicit selection.
    ///
    /// Clears the current selection and advances the epoch, which makes every
    /// previously returned selection stale.
    ///
    /// # Errors
    ///
    /// [`TreeError::StaleSelection`] if atoms were removed since the draw.
    pub fn remove_selected(&mut self, selection: Selection) -> Result<(I, Kappa)> {
        self.check_fresh(&selection)?;
        let position = selection.position();
        let last = self.leaves.len() - 1;

        let removed = self.leaves.swap_remove(position);
        if position != last {
            let moved = self.leaves.kappa(position).map_or(0.0, kappa_total);
            self.sums.set(position, moved);
        }
        self.sums.set(last, 0.0);

        self.current = None;
        self.epoch += 1;
        self.maybe_shrink();
        trace!(
            position,
            relocated_from = last,
            total = self.get_kappa(),
            "removed atom"
        );
        Ok(removed)
    }

    // -------------------------------------------------------------------------
    // Maintenance
    // -------------------------------------------------------------------------

    /// Recompute every partial sum from the stored weights.
    ///
    /// Sums are always kept consistent; this is for callers that want to
    /// reset the summation order after a very long run.
    pub fn rebuild_sums(&mut self) {
        let totals = self.leaves.totals_from(0);
        let mut sums = PartialSumTree::with_capacity(self.sums.capacity());
        sums.set_range(0, &totals);
        self.sums = sums;
        debug!(
            atoms = totals.len(),
            total = self.sums.total(),
            "rebuilt partial sums"
        );
    }

    /// Drop every atom and return to the configured starting capacity.
    pub fn clear(&mut self) {
        self.leaves.clear();
        self.sums = PartialSumTree::with_capacity(self.config.start_capacity());
        self.current = None;
        self.epoch += 1;
    }

    /// Verify that the partial sums agree with the stored weights.
    ///
    /// Checks that every internal node equals the sum of its children, that
    /// each leaf equals its atom's total, that unused leaves are zero and that
    /// the root is finite and matches an independent sum within
    /// `relative_tolerance`.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvariantViolation`] describing the first violation found.
    pub fn check_invariants(&self, relative_tolerance: f64) -> Result<()> {
        if let Some(node) = self.sums.first_inconsistent_node() {
            return Err(TreeError::InvariantViolation(format!(
                "node {node} is not the sum of its children"
            )));
        }
        for position in 0..self.sums.capacity() {
            let expected = self.leaves.kappa(position).map_or(0.0, kappa_total);
            #[allow(clippy::float_cmp)]
            let matches = self.sums.leaf(position) == expected;
            if !matches {
                return Err(TreeError::InvariantViolation(format!(
                    "leaf {position} holds {} but its atom sums to {expected}",
                    self.sums.leaf(position)
                )));
            }
        }
        let root = self.get_kappa();
        if !root.is_finite() {
            return Err(TreeError::InvariantViolation(format!(
                "root {root} is not finite"
            )));
        }
        let independent: f64 = self.leaves.iter().map(|(_, kappa)| kappa_total(kappa)).sum();
        let scale = independent.abs().max(f64::MIN_POSITIVE);
        // NaN must fail the comparison
        let within = (root - independent).abs() / scale <= relative_tolerance;
        if !within {
            return Err(TreeError::InvariantViolation(format!(
                "root {root} differs from weight sum {independent}"
            )));
        }
        Ok(())
    }

    fn check_fresh(&self, selection: &Selection) -> Result<()> {
        if selection.epoch() != self.epoch || selection.position() >= self.leaves.len() {
            return Err(TreeError::StaleSelection {
                position: selection.position(),
            });
        }
        Ok(())
    }

    fn maybe_shrink(&mut self) {
        if !self.config.shrink {
            return;
        }
        let floor = self.config.floor_capacity();
        let mut capacity = self.sums.capacity();
        while capacity > floor && self.leaves.len() * 4 <= capacity {
            capacity /= 2;
        }
        if capacity < self.sums.capacity() {
            self.sums.resize(capacity, self.leaves.len());
        }
    }
}

impl<I> Default for SamplingTree<I> {
    fn default() -> Self {
        Self::new()
    }
}

fn check_total(total: f64) -> Result<()> {
    if total.is_finite() {
        Ok(())
    } else {
        warn!(total, "rejecting weights whose grand total overflows");
        Err(TreeError::TotalOverflow { total })
    }
}

//! Dense per-atom weight storage.
//!
//! Atoms live at positions `0..len` with no gaps. Removing an atom moves the
//! last atom into the vacated position, so positions are reused and the
//! position → id mapping has to be consulted after every removal.

use tracing::warn;

use crate::core::{Result, TreeError, JUMP_COUNT};

/// The four jump weights of a single atom.
pub type Kappa = [f64; JUMP_COUNT];

/// Validate one weight row and copy it into a fixed-size array.
///
/// # Errors
///
/// - [`TreeError::DimensionMismatch`] if `row` does not have exactly
///   [`JUMP_COUNT`] entries
/// - [`TreeError::NonFiniteWeight`] for NaN or infinite entries
/// - [`TreeError::NegativeWeight`] for entries below zero
/// - [`TreeError::TotalOverflow`] if the entries are finite but their sum is not
pub fn validate_kappa(row: &[f64]) -> Result<Kappa> {
    let kappa: Kappa = row.try_into().map_err(|_| TreeError::DimensionMismatch {
        expected: JUMP_COUNT,
        actual: row.len(),
    })?;
    for (slot, &value) in kappa.iter().enumerate() {
        if !value.is_finite() {
            warn!(slot, value, "rejecting non-finite weight");
            return Err(TreeError::NonFiniteWeight { slot, value });
        }
        if value < 0.0 {
            warn!(slot, value, "rejecting negative weight");
            return Err(TreeError::NegativeWeight { slot, value });
        }
    }
    let total = kappa_total(&kappa);
    if !total.is_finite() {
        warn!(total, "rejecting weight row with overflowing total");
        return Err(TreeError::TotalOverflow { total });
    }
    Ok(kappa)
}

/// Sum of an atom's four slots, added left to right.
#[inline]
#[must_use]
pub fn kappa_total(kappa: &Kappa) -> f64 {
    kappa.iter().sum()
}

/// Pick a slot inside one atom.
///
/// Slots cover consecutive half-open intervals `[low, low + weight)`. When
/// rounding leaves `remainder` at or past the atom's total, the last slot with
/// non-zero weight is returned. Returns `None` if every slot is zero.
#[must_use]
pub fn select_slot(kappa: &Kappa, remainder: f64) -> Option<usize> {
    let mut remaining = remainder;
    for (slot, &weight) in kappa.iter().enumerate() {
        if remaining < weight {
            return Some(slot);
        }
        remaining -= weight;
    }
    kappa.iter().rposition(|&weight| weight > 0.0)
}

/// Weights and caller ids stored by position.
#[derive(Debug, Clone)]
pub struct LeafStore<I> {
    kappas: Vec<Kappa>,
    ids: Vec<I>,
}

impl<I> LeafStore<I> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            kappas: Vec::new(),
            ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.kappas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kappas.is_empty()
    }

    /// Append an atom at the next free position and return that position.
    pub fn push(&mut self, id: I, kappa: Kappa) -> usize {
        self.kappas.push(kappa);
        self.ids.push(id);
        self.kappas.len() - 1
    }

    /// Remove the atom at `position`, moving the last atom into its place.
    ///
    /// Returns the removed atom. `position` must be in bounds.
    pub fn swap_remove(&mut self, position: usize) -> (I, Kappa) {
        let kappa = self.kappas.swap_remove(position);
        let id = self.ids.swap_remove(position);
        (id, kappa)
    }

    #[must_use]
    pub fn kappa(&self, position: usize) -> Option<&Kappa> {
        self.kappas.get(position)
    }

    pub fn kappa_mut(&mut self, position: usize) -> Option<&mut Kappa> {
        self.kappas.get_mut(position)
    }

    #[must_use]
    pub fn id(&self, position: usize) -> Option<&I> {
        self.ids.get(position)
    }

    /// Per-atom totals for positions `from..len`, in position order.
    #[must_use]
    pub fn totals_from(&self, from: usize) -> Vec<f64> {
        self.kappas[from..].iter().map(kappa_total).collect()
    }

    /// Iterate over `(id, weights)` in position order.
    pub fn iter(&self) -> impl Iterator<Item = (&I, &Kappa)> {
        self.ids.iter().zip(self.kappas.iter())
    }

    pub fn clear(&mut self) {
        self.kappas.clear();
        self.ids.clear();
    }
}

impl<I> Default for LeafStore<I> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Validation Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_accepts_zeros() {
        assert_eq!(validate_kappa(&[0.0; 4]), Ok([0.0; 4]));
    }

    #[test]
    fn test_validate_wrong_length() {
        assert_eq!(
            validate_kappa(&[1.0, 2.0, 3.0]),
            Err(TreeError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        );
        assert!(validate_kappa(&[1.0; 5]).is_err());
    }

    #[test]
    fn test_validate_negative() {
        assert_eq!(
            validate_kappa(&[1.0, -0.1, 0.0, 0.0]),
            Err(TreeError::NegativeWeight {
                slot: 1,
                value: -0.1
            })
        );
    }

    #[test]
    fn test_validate_non_finite() {
        assert!(matches!(
            validate_kappa(&[0.0, 0.0, f64::NAN, 0.0]),
            Err(TreeError::NonFiniteWeight { slot: 2, .. })
        ));
        assert!(matches!(
            validate_kappa(&[f64::INFINITY, 0.0, 0.0, 0.0]),
            Err(TreeError::NonFiniteWeight { slot: 0, .. })
        ));
    }

    #[test]
    fn test_validate_row_total_overflow() {
        assert_eq!(
            validate_kappa(&[1e308, 1e308, 0.0, 0.0]),
            Err(TreeError::TotalOverflow {
                total: f64::INFINITY
            })
        );
        assert!(validate_kappa(&[1e308, 0.0, 0.0, 1e307]).is_ok());
    }

    // -------------------------------------------------------------------------
    // Slot Selection Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_select_slot_intervals() {
        let kappa = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(select_slot(&kappa, 0.0), Some(0));
        assert_eq!(select_slot(&kappa, 0.999), Some(0));
        assert_eq!(select_slot(&kappa, 1.0), Some(1));
        assert_eq!(select_slot(&kappa, 5.5), Some(2));
        assert_eq!(select_slot(&kappa, 9.0), Some(3));
    }

    #[test]
    fn test_select_slot_skips_zero_weights() {
        let kappa = [0.0, 2.0, 0.0, 1.0];
        assert_eq!(select_slot(&kappa, 0.0), Some(1));
        assert_eq!(select_slot(&kappa, 2.0), Some(3));
    }

    #[test]
    fn test_select_slot_clamps_to_last_nonzero() {
        let kappa = [1.0, 1.0, 1.0, 0.0];
        assert_eq!(select_slot(&kappa, 3.0), Some(2));
        assert_eq!(select_slot(&kappa, 100.0), Some(2));
    }

    #[test]
    fn test_select_slot_all_zero() {
        assert_eq!(select_slot(&[0.0; 4], 0.0), None);
    }

    // -------------------------------------------------------------------------
    // Storage Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_push_and_lookup() {
        let mut store = LeafStore::new();
        assert_eq!(store.push("a", [1.0; 4]), 0);
        assert_eq!(store.push("b", [2.0; 4]), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.id(1), Some(&"b"));
        assert_eq!(store.kappa(0), Some(&[1.0; 4]));
        assert_eq!(store.id(2), None);
    }

    #[test]
    fn test_swap_remove_relocates_last() {
        let mut store = LeafStore::new();
        for (id, w) in [(10, 1.0), (11, 2.0), (12, 3.0)] {
            store.push(id, [w; 4]);
        }
        let (id, kappa) = store.swap_remove(0);
        assert_eq!(id, 10);
        assert_eq!(kappa, [1.0; 4]);
        assert_eq!(store.id(0), Some(&12));
        assert_eq!(store.kappa(0), Some(&[3.0; 4]));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_totals_from() {
        let mut store = LeafStore::new();
        store.push(0, [1.0, 1.0, 1.0, 1.0]);
        store.push(1, [0.5, 0.0, 0.0, 0.5]);
        assert_eq!(store.totals_from(0), vec![4.0, 1.0]);
        assert_eq!(store.totals_from(1), vec![1.0]);
        assert!(store.totals_from(2).is_empty());
    }
}

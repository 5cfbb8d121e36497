//! Capacity configuration for the sampling tree.
//!
//! The partial-sum array is sized to a power of two. These settings control
//! where that power of two starts and whether it is allowed to shrink again
//! after removals.

/// Storage configuration for a [`SamplingTree`](crate::core::SamplingTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Leaf capacity reserved at construction (rounded up to a power of two).
    pub initial_capacity: usize,
    /// The capacity never shrinks below this value.
    pub min_capacity: usize,
    /// Halve the capacity when occupancy falls to a quarter of it.
    pub shrink: bool,
}

impl TreeConfig {
    /// Default configuration: a small up-front reservation, shrinking enabled.
    #[must_use]
    pub const fn basic() -> Self {
        Self {
            initial_capacity: 16,
            min_capacity: 16,
            shrink: true,
        }
    }

    /// Allocate nothing ahead of time and release memory eagerly.
    #[must_use]
    pub const fn compact() -> Self {
        Self {
            initial_capacity: 1,
            min_capacity: 1,
            shrink: true,
        }
    }

    /// Reserve room for `atoms` atoms and never give it back.
    #[must_use]
    pub const fn preallocated(atoms: usize) -> Self {
        Self {
            initial_capacity: atoms,
            min_capacity: atoms,
            shrink: false,
        }
    }

    /// Smallest power-of-two capacity the tree may use.
    #[must_use]
    pub fn floor_capacity(&self) -> usize {
        self.min_capacity.max(1).next_power_of_two()
    }

    /// Capacity used by a freshly constructed tree.
    #[must_use]
    pub fn start_capacity(&self) -> usize {
        self.initial_capacity
            .max(1)
            .next_power_of_two()
            .max(self.floor_capacity())
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::basic()
    }
}

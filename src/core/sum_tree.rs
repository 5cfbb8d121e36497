//! Flat-array partial-sum tree over atom positions.
//!
//! The tree is a complete binary tree stored in a single `Vec<f64>` using the
//! 1-indexed heap layout:
//!
//! - node 1 is the root and holds the grand total
//! - node `k` has children `2k` and `2k + 1`
//! - leaf for position `p` lives at `capacity + p`
//!
//! Index 0 is unused. Parents are always recomputed as `left + right` rather
//! than adjusted by a delta, so every internal node is the exact floating-point
//! sum of its two children and no drift accumulates across updates.

use tracing::debug;

/// Partial sums over a power-of-two number of leaves.
#[derive(Debug, Clone)]
pub struct PartialSumTree {
    /// Number of leaves (always a power of two).
    capacity: usize,
    /// Heap-ordered node values; length `2 * capacity`.
    nodes: Vec<f64>,
}

/// Result of a top-down descent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Descent {
    /// Leaf position reached.
    pub position: usize,
    /// Target value left over, relative to the start of the reached leaf.
    pub remainder: f64,
}

impl PartialSumTree {
    /// Create a tree of zeros with at least `capacity` leaves.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        Self {
            capacity,
            nodes: vec![0.0; 2 * capacity],
        }
    }

    /// Number of leaves.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Grand total stored at the root.
    #[inline]
    #[must_use]
    pub fn total(&self) -> f64 {
        self.nodes[1]
    }

    /// Value of the leaf at `position`.
    #[inline]
    #[must_use]
    pub fn leaf(&self, position: usize) -> f64 {
        self.nodes[self.capacity + position]
    }

    /// Value of an arbitrary heap node.
    #[must_use]
    pub fn node(&self, index: usize) -> Option<f64> {
        if index == 0 {
            return None;
        }
        self.nodes.get(index).copied()
    }

    /// Set a single leaf and repair the path to the root. O(log capacity).
    pub fn set(&mut self, position: usize, value: f64) {
        let mut index = self.capacity + position;
        self.nodes[index] = value;
        while index > 1 {
            index /= 2;
            self.nodes[index] = self.nodes[2 * index] + self.nodes[2 * index + 1];
        }
    }

    /// Write a run of leaves starting at `first` and repair their ancestors.
    ///
    /// Ancestors are repaired one level at a time over the covering interval,
    /// so a batch of `k` leaves costs O(k + log capacity).
    pub fn set_range(&mut self, first: usize, values: &[f64]) {
        if values.is_empty() {
            return;
        }
        let start = self.capacity + first;
        self.nodes[start..start + values.len()].copy_from_slice(values);

        let mut lo = start;
        let mut hi = start + values.len() - 1;
        while lo > 1 {
            lo /= 2;
            hi /= 2;
            for index in lo..=hi {
                self.nodes[index] = self.nodes[2 * index] + self.nodes[2 * index + 1];
            }
        }
    }

    /// Reallocate to `capacity` leaves, keeping the first `live` leaf values.
    ///
    /// Used for both doubling and halving. The whole array is rebuilt in
    /// O(capacity), which amortizes to O(1) per atom appended or removed.
    pub fn resize(&mut self, capacity: usize, live: usize) {
        let capacity = capacity.max(1).next_power_of_two();
        debug_assert!(live <= capacity, "live leaves exceed new capacity");
        debug!(
            from = self.capacity,
            to = capacity,
            live,
            "resizing partial-sum tree"
        );

        let mut nodes = vec![0.0; 2 * capacity];
        nodes[capacity..capacity + live]
            .copy_from_slice(&self.nodes[self.capacity..self.capacity + live]);
        self.capacity = capacity;
        self.nodes = nodes;
        self.rebuild();
    }

    /// Recompute every internal node from the leaves.
    pub fn rebuild(&mut self) {
        for index in (1..self.capacity).rev() {
            self.nodes[index] = self.nodes[2 * index] + self.nodes[2 * index + 1];
        }
    }

    /// Walk from the root to a leaf following `target`.
    ///
    /// At each node the target goes left when it is strictly smaller than the
    /// left subtree's total; otherwise the left total is subtracted and the
    /// walk continues right. Intervals are therefore half-open, `[low, high)`.
    ///
    /// The walk never enters an empty subtree: if floating-point drift leaves
    /// the target past everything on the right, it stays on the left side and
    /// the target is clamped to that subtree's total. Returns `None` only when
    /// the root is zero.
    #[must_use]
    pub fn descend(&self, target: f64) -> Option<Descent> {
        if self.total() <= 0.0 {
            return None;
        }

        let mut index = 1;
        let mut remainder = target;
        while index < self.capacity {
            let left = self.nodes[2 * index];
            let right = self.nodes[2 * index + 1];
            if remainder < left || right <= 0.0 {
                index *= 2;
                remainder = remainder.min(left);
            } else {
                remainder -= left;
                index = 2 * index + 1;
            }
        }

        Some(Descent {
            position: index - self.capacity,
            remainder,
        })
    }

    /// Check that every internal node equals the sum of its children.
    ///
    /// Returns the index of the first offending node.
    #[must_use]
    pub fn first_inconsistent_node(&self) -> Option<usize> {
        (1..self.capacity).find(|&index| {
            #[allow(clippy::float_cmp)]
            let consistent =
                self.nodes[index] == self.nodes[2 * index] + self.nodes[2 * index + 1];
            !consistent
        })
    }
}

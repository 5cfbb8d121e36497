//! Error types for the sampling tree.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors reported by [`SamplingTree`](crate::core::SamplingTree) operations.
///
/// Every error is raised before any stored weight or partial sum is touched,
/// so a failed call leaves the tree exactly as it was.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    /// A weight row did not have exactly [`JUMP_COUNT`](crate::core::JUMP_COUNT)
    /// entries, or the weight and id batches differ in length.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("negative weight {value} at slot {slot}")]
    NegativeWeight { slot: usize, value: f64 },

    #[error("non-finite weight {value} at slot {slot}")]
    NonFiniteWeight { slot: usize, value: f64 },

    /// The weights are finite one by one but their sum is not, either within
    /// one atom or across the whole tree.
    #[error("weight total {total} is not finite")]
    TotalOverflow { total: f64 },

    /// No atoms are stored, or every weight is zero.
    #[error("cannot choose an event from an empty tree")]
    EmptyTree,

    /// An operation needing a current selection was called without one.
    #[error("no current selection: call choose_event first")]
    InvalidState,

    /// An explicit selection refers to a tree state that has since changed.
    #[error("selection at position {position} is stale")]
    StaleSelection { position: usize },

    /// The caller-supplied uniform value was outside `[0, 1)`.
    #[error("uniform draw {0} is outside [0, 1)")]
    InvalidDraw(f64),

    /// The partial sums disagree with the stored weights.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

//! Result of a weighted draw.

use crate::core::JUMP_COUNT;

/// The atom slot picked by [`choose_event`](crate::core::SamplingTree::choose_event).
///
/// A selection names an internal position, not a caller id. Positions move
/// when atoms are removed, so each selection also records the tree's epoch at
/// the time of the draw; passing it back after a removal is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
    position: usize,
    jump_id: usize,
    epoch: u64,
}

impl Selection {
    pub(crate) const fn new(position: usize, jump_id: usize, epoch: u64) -> Self {
        debug_assert!(jump_id < JUMP_COUNT);
        Self {
            position,
            jump_id,
            epoch,
        }
    }

    /// Internal storage position of the selected atom.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Which of the atom's four weights was drawn, in `0..4`.
    #[must_use]
    pub const fn jump_id(&self) -> usize {
        self.jump_id
    }

    /// Tree epoch this selection was drawn in.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Index into a flattened `position * 4 + jump_id` weight array.
    #[must_use]
    pub const fn flat_index(&self) -> usize {
        self.position * JUMP_COUNT + self.jump_id
    }
}

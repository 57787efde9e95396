//! The completion table maps each frame slot to the fence value of the last submission that used it.

use crate::core::fence_value::{FenceValue, SlotIndex};

/// Stores, for every frame slot, the fence value that must be reached before that slot's resources may be reused.
/// The size is fixed at creation, and all entries start at [`FenceValue::ZERO`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionTable {
    values: Box<[FenceValue]>,
}

impl CompletionTable {
    /// Create a table for `slots` frame slots.
    pub fn new(slots: usize) -> Self {
        CompletionTable {
            values: vec![FenceValue::ZERO; slots].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the value recorded for a slot.
    /// # Panics
    /// * If `slot` is out of range.
    pub fn get(&self, slot: SlotIndex) -> FenceValue {
        self.check_slot(slot);
        self.values[slot]
    }

    /// Overwrite the value recorded for a slot.
    /// # Panics
    /// * If `slot` is out of range.
    pub fn set(&mut self, slot: SlotIndex, value: FenceValue) {
        self.check_slot(slot);
        self.values[slot] = value;
    }

    /// Iterate over all slots and their recorded values.
    pub fn iter(&self) -> impl Iterator<Item = (SlotIndex, FenceValue)> + '_ {
        self.values.iter().copied().enumerate()
    }

    fn check_slot(&self, slot: SlotIndex) {
        assert!(
            slot < self.values.len(),
            "frame slot {} out of range, only {} frames in flight",
            slot,
            self.values.len()
        );
    }
}

//! Fence counter values and frame slot indices.

use std::fmt::{Display, Formatter};

use anyhow::Result;

use crate::Error;

/// Index of a frame slot, in `[0, frames_in_flight)`. Identifies which set of per-frame command resources
/// is currently being recorded or presented.
pub type SlotIndex = usize;

/// A value of the fence counter. The counter starts at zero and is incremented by exactly one for every
/// submitted frame, so every value handed out by [`FrameSynchronizer::signal()`](crate::FrameSynchronizer::signal)
/// is unique and strictly greater than all values before it.
///
/// A value of zero is never signaled. The GPU completion marker starts at zero, so anything waiting on zero
/// is complete from the start.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FenceValue(u64);

impl FenceValue {
    /// The initial counter value. Never signaled, always complete.
    pub const ZERO: FenceValue = FenceValue(0);

    /// Wrap a raw counter value.
    pub const fn new(value: u64) -> Self {
        FenceValue(value)
    }

    /// Get the raw counter value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this is the initial value.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// The value after this one.
    /// # Errors
    /// * Fails with [`Error::FenceOverflow`] if this is `u64::MAX`.
    pub fn next(self) -> Result<Self> {
        Ok(FenceValue(self.0.checked_add(1).ok_or(Error::FenceOverflow)?))
    }
}

impl From<u64> for FenceValue {
    fn from(value: u64) -> Self {
        FenceValue(value)
    }
}

impl From<FenceValue> for u64 {
    fn from(value: FenceValue) -> Self {
        value.0
    }
}

impl Display for FenceValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

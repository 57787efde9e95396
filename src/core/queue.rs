//! Contracts for the two collaborators the frame synchronizer depends on: the queue that executes
//! submitted commands and signals fence values, and the primitive that blocks until a fence value
//! has been reached.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::core::fence_value::FenceValue;

/// How long a wait is allowed to block.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum WaitTimeout {
    /// Block until the fence value is reached.
    #[default]
    Infinite,
    /// Block for at most this long. A zero duration never blocks.
    Bounded(Duration),
}

impl WaitTimeout {
    /// A timeout that never blocks, useful for polling.
    pub const ZERO: WaitTimeout = WaitTimeout::Bounded(Duration::ZERO);

    /// Get the timeout in nanoseconds, as expected by Vulkan. Infinite waits and durations that do not fit
    /// are mapped to `u64::MAX`.
    pub fn as_nanos(&self) -> u64 {
        match self {
            WaitTimeout::Infinite => u64::MAX,
            WaitTimeout::Bounded(duration) => u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX),
        }
    }
}

impl From<Duration> for WaitTimeout {
    fn from(value: Duration) -> Self {
        WaitTimeout::Bounded(value)
    }
}

/// The result of waiting on a fence value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WaitStatus {
    /// The fence value was reached. Resources guarded by it may be reused.
    Ready,
    /// The timeout elapsed first. Resources guarded by the fence value may still be in use by the GPU.
    TimedOut,
}

impl WaitStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, WaitStatus::Ready)
    }
}

/// A queue that executes submitted commands in order and can signal a fence value once all previously
/// submitted work has finished.
pub trait CommandQueue {
    /// Recorded commands accepted by [`CommandQueue::submit()`].
    type Commands;

    /// Submit recorded commands for execution.
    fn submit(&self, commands: Self::Commands) -> Result<()>;

    /// Arrange for the GPU completion marker to be set to `value` once all work submitted before this call
    /// has finished executing.
    fn signal(&self, value: FenceValue) -> Result<()>;
}

/// Access to the GPU completion marker, the highest fence value the queue has finished processing.
///
/// Implementations must guarantee that the marker only ever increases, and that it reaches a value `v` only
/// after all work submitted before the signal of `v` has completed.
pub trait CompletionWait {
    /// Read the current value of the completion marker. Never blocks.
    fn completed_value(&self) -> Result<FenceValue>;

    /// Block the calling thread until the completion marker reaches `value`, or until the timeout elapses.
    fn wait_for_value(&self, value: FenceValue, timeout: WaitTimeout) -> Result<WaitStatus>;
}

impl<T: CommandQueue + ?Sized> CommandQueue for &T {
    type Commands = T::Commands;

    fn submit(&self, commands: Self::Commands) -> Result<()> {
        (**self).submit(commands)
    }

    fn signal(&self, value: FenceValue) -> Result<()> {
        (**self).signal(value)
    }
}

impl<T: CommandQueue + ?Sized> CommandQueue for Arc<T> {
    type Commands = T::Commands;

    fn submit(&self, commands: Self::Commands) -> Result<()> {
        (**self).submit(commands)
    }

    fn signal(&self, value: FenceValue) -> Result<()> {
        (**self).signal(value)
    }
}

impl<T: CompletionWait + ?Sized> CompletionWait for &T {
    fn completed_value(&self) -> Result<FenceValue> {
        (**self).completed_value()
    }

    fn wait_for_value(&self, value: FenceValue, timeout: WaitTimeout) -> Result<WaitStatus> {
        (**self).wait_for_value(value, timeout)
    }
}

impl<T: CompletionWait + ?Sized> CompletionWait for Arc<T> {
    fn completed_value(&self) -> Result<FenceValue> {
        (**self).completed_value()
    }

    fn wait_for_value(&self, value: FenceValue, timeout: WaitTimeout) -> Result<WaitStatus> {
        (**self).wait_for_value(value, timeout)
    }
}

//! Exposes the fencepost error type

use std::sync::PoisonError;

use thiserror::Error;

/// Error type that fencepost can return.
///
/// Note that a wait running out of time is not an error. It is reported as
/// [`WaitStatus::TimedOut`](crate::WaitStatus::TimedOut) and must be handled by the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// Generic Vulkan error type.
    #[error("Vulkan error: `{0}`")]
    VkError(ash::vk::Result),
    /// The number of frames in flight must be at least one.
    #[error("Invalid number of frames in flight: `{0}`. At least one frame is required.")]
    InvalidFrameCount(usize),
    /// The fence counter reached `u64::MAX` and cannot be incremented again.
    #[error("Fence counter overflowed.")]
    FenceOverflow,
    /// A wait without a timeout returned before the fence value was reached. This points to a bug in the
    /// [`CompletionWait`](crate::CompletionWait) implementation.
    #[error("Wait without timeout returned before fence value `{0}` was reached.")]
    UnboundedWaitTimedOut(u64),
    /// Poisoned mutex
    #[error("Poisoned mutex")]
    PoisonError,
    /// Uncategorized error.
    #[error("Uncategorized error: `{0}`")]
    Uncategorized(&'static str),
}

impl From<ash::vk::Result> for Error {
    fn from(value: ash::vk::Result) -> Self {
        Error::VkError(value)
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::PoisonError
    }
}

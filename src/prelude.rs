//! Re-exports the most commonly used types and traits.

pub use ash::vk;

pub use crate::core::app_info::*;
pub use crate::core::error::Error;
pub use crate::core::fence_value::*;
pub use crate::core::queue::*;

pub use crate::sync::completion_table::CompletionTable;
pub use crate::sync::cpu_timeline::{CompletionMode, CpuTimeline};
pub use crate::sync::frame_sync::{FrameSynchronizer, SlotState};
pub use crate::sync::slot_future::SlotFuture;

pub use crate::vulkan::{TimelineSemaphore, VulkanQueue};

pub use crate::wsi::frame::{FrameManager, FrameOutcome, InFlightContext, Present};

/// Re-exports all traits, for when the types are imported under a namespace.
pub mod traits {
    pub use crate::core::queue::{CommandQueue, CompletionWait};
    pub use crate::wsi::frame::Present;
}

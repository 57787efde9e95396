//! Vulkan implementation of the collaborator traits.
//!
//! - [`semaphore`] wraps a timeline `VkSemaphore`, the counter the GPU advances as work completes.
//! - [`queue`] pairs a `VkQueue` with a timeline semaphore and implements both [`CommandQueue`](crate::CommandQueue)
//! and [`CompletionWait`](crate::CompletionWait) for it.
//!
//! # Example
//! ```no_run
//! use fencepost::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! # let device: ash::Device = unimplemented!();
//! # let queue: vk::Queue = unimplemented!();
//! let queue = VulkanQueue::new(device.clone(), queue)?;
//! let mut sync = FrameSynchronizer::new(&queue, &queue, 3)?;
//! // ... run the frame loop ...
//! sync.flush()?;
//! # Ok(())
//! # }
//! ```

pub mod queue;
pub mod semaphore;

pub use queue::VulkanQueue;
pub use semaphore::TimelineSemaphore;

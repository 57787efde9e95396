//! Fence-based frame pacing for GPU command queues
//!
//! Fencepost keeps track of which frames a GPU queue has finished, so that the command memory belonging
//! to a frame is never reset or re-recorded while the GPU may still be reading it. The CPU is free to
//! race ahead and record the next frame as long as that frame's slot has been retired.
//!
//! To get started, the easiest way is to simply
//! ```
//! // Import all important traits
//! use fencepost::prelude::traits;
//! // Import types under a namespace.
//! use fencepost::prelude as fp;
//!
//! // Or, if you dont care about using the types under a namespace
//! use fencepost::prelude::*;
//! ```
//!
//! # Example
//!
//! The synchronizer talks to two collaborators: a [`CommandQueue`](crate::CommandQueue) that accepts
//! submissions and fence signals, and a [`CompletionWait`](crate::CompletionWait) that exposes the
//! GPU's completion marker. The [`vulkan`] module implements both on top of a timeline semaphore, and
//! [`CpuTimeline`](crate::CpuTimeline) implements both on the host for headless use and testing.
//! ```
//! use fencepost::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let settings = SyncBuilder::new()
//!     .name("fencepost demo")
//!     .frames_in_flight(3)
//!     .build();
//!
//! let timeline = CpuTimeline::<&'static str>::new(CompletionMode::Immediate);
//! let mut frame = FrameManager::new(timeline.clone(), timeline.clone(), &settings)?;
//!
//! let mut present = |_ifc: &InFlightContext| -> anyhow::Result<()> { Ok(()) };
//! for _ in 0..10 {
//!     frame.new_frame(|_ifc| Ok("draw triangle"), &mut present)?;
//! }
//! // Drain all outstanding work before tearing anything down.
//! frame.flush()?;
//! # Ok(())
//! # }
//! ```
//! For further details, check out the following modules
//! - [`sync`] for the frame synchronizer, the completion table and the host-side timeline.
//! - [`wsi`] for the per-frame loop driving the synchronizer.
//! - [`vulkan`] for the Vulkan queue and timeline semaphore backend.
//! - [`core`] for settings, errors and the collaborator traits.

#[macro_use]
extern crate derivative;
#[macro_use]
extern crate log;

pub mod prelude;
pub use crate::prelude::*;

pub mod core;
pub mod sync;
pub mod vulkan;
pub mod wsi;

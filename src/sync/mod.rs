//! The sync module provides the frame pacing machinery.
//!
//! - The [`frame_sync`] module provides the [`FrameSynchronizer`](crate::FrameSynchronizer), which hands out fence values
//! and blocks until frame slots can be reused.
//! - The [`completion_table`] module stores the fence value each frame slot is waiting on.
//! - The [`slot_future`] module provides an implementation of [`Future`](std::future::Future) for slot waits.
//! - The [`cpu_timeline`] module provides a host-side queue and completion marker, for headless use and testing.

pub mod completion_table;
pub mod cpu_timeline;
pub mod frame_sync;
pub mod slot_future;

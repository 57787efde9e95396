//! Contains the per-frame loop that drives the [`FrameSynchronizer`].
//!
//! Every frame should be contained in a call to [`FrameManager::new_frame`], which takes in a closure that is called when the
//! frame's slot is ready to be recorded. This closure is given an [`InFlightContext`] describing the slot, and returns the
//! commands to submit for this frame. After submission, the frame is handed to a [`Present`] implementation.
//!
//! Each call runs the frame protocol in this order:
//! 1. Pick the next slot, `(slot + 1) mod N`.
//! 2. Wait until the GPU retired the last frame that used this slot.
//! 3. Call the record closure, which resets and re-records the slot's command resources.
//! 4. Submit the recorded commands.
//! 5. Signal a new fence value and record it for the slot.
//! 6. Present.
//!
//! # Example usage
//! ```
//! use fencepost::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let settings = SyncBuilder::new().frames_in_flight(2).build();
//! let timeline = CpuTimeline::<usize>::new(CompletionMode::Immediate);
//! let mut frame = FrameManager::new(timeline.clone(), timeline.clone(), &settings)?;
//!
//! let mut present = |ifc: &InFlightContext| -> anyhow::Result<()> {
//!     println!("presenting frame {} from slot {}", ifc.frame, ifc.slot);
//!     Ok(())
//! };
//! let outcome = frame.new_frame(|ifc| {
//!     // Reset and record the command resources belonging to `ifc.slot` here.
//!     Ok(ifc.slot)
//! }, &mut present)?;
//! assert!(matches!(outcome, FrameOutcome::Presented { slot: 1, .. }));
//! frame.flush()?;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;

use crate::core::app_info::SyncSettings;
use crate::core::fence_value::{FenceValue, SlotIndex};
use crate::core::queue::{CommandQueue, CompletionWait, WaitStatus, WaitTimeout};
use crate::sync::frame_sync::FrameSynchronizer;

/// Describes the frame that is being recorded. Passed to the record closure given to [`FrameManager::new_frame()`],
/// and to [`Present::present()`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InFlightContext {
    /// The frame slot whose command resources may be recorded.
    pub slot: SlotIndex,
    /// Number of this frame, counting from zero.
    pub frame: u64,
    /// The fence value that was waited on before handing out this slot. Zero if the slot was never used before.
    pub retired_value: FenceValue,
}

/// Presents a submitted frame. Swap chain handling itself is up to the implementation.
pub trait Present {
    fn present(&mut self, ifc: &InFlightContext) -> Result<()>;
}

impl<F: FnMut(&InFlightContext) -> Result<()>> Present for F {
    fn present(&mut self, ifc: &InFlightContext) -> Result<()> {
        self(ifc)
    }
}

/// What happened during a call to [`FrameManager::new_frame()`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was recorded, submitted and presented.
    Presented {
        slot: SlotIndex,
        /// Fence value that guards this frame's resources.
        value: FenceValue,
    },
    /// The next slot was not retired within the configured timeout. Nothing was recorded or submitted, and the next call
    /// tries the same slot again.
    Stalled {
        slot: SlotIndex,
        waiting_for: FenceValue,
    },
}

/// Responsible for running the per-frame protocol on top of a [`FrameSynchronizer`].
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct FrameManager<Q: CommandQueue, W: CompletionWait> {
    sync: FrameSynchronizer<Q, W>,
    wait_timeout: WaitTimeout,
    frame_count: u64,
}

impl<Q: CommandQueue, W: CompletionWait> FrameManager<Q, W> {
    /// Initialize the frame manager and its synchronizer.
    pub fn new(queue: Q, waiter: W, settings: &SyncSettings) -> Result<Self> {
        Ok(FrameManager {
            sync: FrameSynchronizer::with_settings(queue, waiter, settings)?,
            wait_timeout: settings.wait_timeout,
            frame_count: 0,
        })
    }

    /// Run one frame. `record` is called once the frame's slot is safe to reuse, and must return the commands for this
    /// frame. These are submitted, fenced, and then presented through `present`.
    ///
    /// Errors from the record closure, the queue or the presenter are returned unmodified. If recording or submission fails,
    /// the slot keeps its previous fence value and the next call tries the same slot again.
    pub fn new_frame<F, P>(&mut self, record: F, present: &mut P) -> Result<FrameOutcome>
    where
        F: FnOnce(InFlightContext) -> Result<Q::Commands>,
        P: Present + ?Sized, {
        let slot = self.sync.next_slot();
        let retired_value = self.sync.slot_value(slot);
        if self.sync.wait_for_slot(slot, self.wait_timeout)? == WaitStatus::TimedOut {
            return Ok(FrameOutcome::Stalled {
                slot,
                waiting_for: retired_value,
            });
        }
        let ifc = InFlightContext {
            slot,
            frame: self.frame_count,
            retired_value,
        };
        let commands = record(ifc)?;
        let value = self.sync.submit_frame(slot, commands)?;
        self.sync.advance_slot();
        self.frame_count += 1;
        present.present(&ifc)?;
        Ok(FrameOutcome::Presented {
            slot,
            value,
        })
    }

    /// Block until all submitted frames have completed. Call this before destroying frame resources, at shutdown
    /// or when resizing the swap chain.
    pub fn flush(&mut self) -> Result<()> {
        self.sync.flush()
    }

    /// Number of frames submitted so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn wait_timeout(&self) -> WaitTimeout {
        self.wait_timeout
    }

    /// Change the wait policy used for following frames.
    pub fn set_wait_timeout(&mut self, timeout: impl Into<WaitTimeout>) {
        self.wait_timeout = timeout.into();
    }

    /// Access the underlying synchronizer.
    pub fn synchronizer(&self) -> &FrameSynchronizer<Q, W> {
        &self.sync
    }

    /// Mutable access to the underlying synchronizer, for submissions outside of [`FrameManager::new_frame()`].
    pub fn synchronizer_mut(&mut self) -> &mut FrameSynchronizer<Q, W> {
        &mut self.sync
    }
}

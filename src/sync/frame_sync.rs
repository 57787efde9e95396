//! Exposes the [`FrameSynchronizer`], which guarantees per-frame command resources are never reused while the GPU
//! may still be reading them.
//!
//! The synchronizer owns a fence counter and a [`CompletionTable`]. Every submitted frame is followed by a
//! [`signal()`](FrameSynchronizer::signal) that hands out the next counter value, which is then stored in the table
//! for the slot the frame used. Before a slot is recorded again, [`wait_for_slot()`](FrameSynchronizer::wait_for_slot)
//! blocks until the GPU completion marker has passed that value.
//!
//! # Example
//! ```
//! use fencepost::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let timeline = CpuTimeline::<u32>::new(CompletionMode::Manual);
//! let mut sync = FrameSynchronizer::new(timeline.clone(), timeline.clone(), 2)?;
//!
//! let slot = sync.advance_slot();
//! // Nothing was ever submitted on this slot, so this returns immediately.
//! assert!(sync.wait_for_slot(slot, WaitTimeout::Infinite)?.is_ready());
//! let value = sync.submit_frame(slot, 7)?;
//!
//! // The GPU has not reached the value yet.
//! assert_eq!(sync.wait_for_slot(slot, WaitTimeout::ZERO)?, WaitStatus::TimedOut);
//! timeline.complete_up_to(value)?;
//! assert_eq!(sync.wait_for_slot(slot, WaitTimeout::ZERO)?, WaitStatus::Ready);
//! # Ok(())
//! # }
//! ```

use anyhow::Result;

use crate::core::app_info::SyncSettings;
use crate::core::fence_value::{FenceValue, SlotIndex};
use crate::core::queue::{CommandQueue, CompletionWait, WaitStatus, WaitTimeout};
use crate::sync::completion_table::CompletionTable;
use crate::sync::slot_future::SlotFuture;
use crate::Error;

/// The state of a single frame slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SlotState {
    /// No work using this slot is outstanding, its resources may be re-recorded.
    Idle,
    /// Work using this slot was submitted and the GPU has not yet reached its fence value.
    Pending(FenceValue),
}

/// Tracks which submitted frames the GPU has completed.
///
/// The synchronizer holds on to its two collaborators, but does not need to own them. Both
/// [`CommandQueue`] and [`CompletionWait`] are implemented for references and [`Arc`](std::sync::Arc)s,
/// so they can be borrowed or shared with the rest of the renderer.
///
/// All mutating operations take `&mut self`, submission must therefore happen from a single thread
/// (or be externally serialized).
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct FrameSynchronizer<Q: CommandQueue, W: CompletionWait> {
    #[derivative(Debug = "ignore")]
    queue: Q,
    #[derivative(Debug = "ignore")]
    waiter: W,
    name: String,
    fence_value: FenceValue,
    table: CompletionTable,
    current_slot: SlotIndex,
}

impl<Q: CommandQueue, W: CompletionWait> FrameSynchronizer<Q, W> {
    /// Create a new frame synchronizer with `frames_in_flight` slots. The fence counter and all
    /// slot values start at zero.
    /// # Errors
    /// * Fails with [`Error::InvalidFrameCount`] if `frames_in_flight` is zero.
    pub fn new(queue: Q, waiter: W, frames_in_flight: usize) -> Result<Self> {
        Self::with_settings(
            queue,
            waiter,
            &SyncSettings {
                frames_in_flight,
                ..Default::default()
            },
        )
    }

    /// Create a new frame synchronizer from settings. Only the name and frame count are used, the wait
    /// policy is up to the caller (see [`FrameManager`](crate::FrameManager)).
    pub fn with_settings(queue: Q, waiter: W, settings: &SyncSettings) -> Result<Self> {
        if settings.frames_in_flight == 0 {
            return Err(Error::InvalidFrameCount(settings.frames_in_flight).into());
        }
        info!(
            "Created frame synchronizer {:?} with {} frames in flight",
            settings.name, settings.frames_in_flight
        );
        Ok(FrameSynchronizer {
            queue,
            waiter,
            name: settings.name.clone(),
            fence_value: FenceValue::ZERO,
            table: CompletionTable::new(settings.frames_in_flight),
            current_slot: 0,
        })
    }

    /// Increment the fence counter and ask the queue to signal the new value once all previously submitted
    /// work has finished. Call this exactly once per submitted frame, right after submitting it.
    ///
    /// If the queue fails to signal, the counter is left untouched and the error is returned as-is.
    pub fn signal(&mut self) -> Result<FenceValue> {
        let value = self.fence_value.next()?;
        self.queue.signal(value)?;
        self.fence_value = value;
        #[cfg(feature = "log-fences")]
        trace!("[{}] Signaled fence value {}", self.name, value);
        Ok(value)
    }

    /// Associate a fence value with the slot whose resources the signaled frame used, overwriting the previous entry.
    /// # Panics
    /// * If `slot` is out of range.
    /// * If `value` was never returned by [`FrameSynchronizer::signal()`], which means the per-frame protocol is broken.
    pub fn record_slot_value(&mut self, slot: SlotIndex, value: FenceValue) {
        assert!(
            !value.is_zero() && value <= self.fence_value,
            "fence value {} recorded for slot {} was never signaled (counter is at {})",
            value,
            slot,
            self.fence_value
        );
        self.table.set(slot, value);
        #[cfg(feature = "log-fences")]
        trace!("[{}] Slot {} now waits on fence value {}", self.name, slot, value);
    }

    /// Wait until the resources of a slot may be re-recorded.
    ///
    /// Returns [`WaitStatus::Ready`] without blocking if the GPU already passed the slot's fence value. Otherwise this
    /// blocks until the value is reached or the timeout elapses. On [`WaitStatus::TimedOut`] the slot is still in use and
    /// its resources must not be touched.
    /// # Panics
    /// * If `slot` is out of range.
    pub fn wait_for_slot(&self, slot: SlotIndex, timeout: WaitTimeout) -> Result<WaitStatus> {
        let value = self.table.get(slot);
        if value.is_zero() || self.waiter.completed_value()? >= value {
            return Ok(WaitStatus::Ready);
        }
        let status = self.waiter.wait_for_value(value, timeout)?;
        if status == WaitStatus::TimedOut {
            warn!(
                "[{}] Frame slot {} stalled: timed out after {:?} waiting for fence value {}",
                self.name, slot, timeout, value
            );
        }
        Ok(status)
    }

    /// Obtain a future that resolves once the slot's resources may be re-recorded. This does not block the calling thread.
    /// # Panics
    /// * If `slot` is out of range.
    pub fn wait_for_slot_async(&self, slot: SlotIndex) -> SlotFuture<'_, W> {
        SlotFuture::new(&self.waiter, self.table.get(slot))
    }

    /// Signal a new fence value and block until the GPU reaches it. When this returns, all previously submitted work
    /// has completed. Use this before destroying resources, for example at shutdown or on resize.
    pub fn flush(&mut self) -> Result<()> {
        let value = self.signal()?;
        debug!("[{}] Flushing queue up to fence value {}", self.name, value);
        match self.waiter.wait_for_value(value, WaitTimeout::Infinite)? {
            WaitStatus::Ready => Ok(()),
            WaitStatus::TimedOut => Err(Error::UnboundedWaitTimedOut(value.get()).into()),
        }
    }

    /// Submit recorded commands to the queue. Follow up with [`FrameSynchronizer::signal()`] and
    /// [`FrameSynchronizer::record_slot_value()`], or use [`FrameSynchronizer::submit_frame()`] to do all three.
    pub fn submit(&self, commands: Q::Commands) -> Result<()> {
        self.queue.submit(commands)
    }

    /// Submit a frame's commands, signal a new fence value and record it for `slot`, in that order.
    pub fn submit_frame(&mut self, slot: SlotIndex, commands: Q::Commands) -> Result<FenceValue> {
        self.submit(commands)?;
        let value = self.signal()?;
        self.record_slot_value(slot, value);
        Ok(value)
    }

    /// The slot after the current one.
    pub fn next_slot(&self) -> SlotIndex {
        (self.current_slot + 1) % self.table.len()
    }

    /// Move on to the next slot and return it.
    pub fn advance_slot(&mut self) -> SlotIndex {
        self.current_slot = self.next_slot();
        self.current_slot
    }

    pub fn current_slot(&self) -> SlotIndex {
        self.current_slot
    }

    pub fn frames_in_flight(&self) -> usize {
        self.table.len()
    }

    /// The last fence value handed out by [`FrameSynchronizer::signal()`], or zero if nothing was signaled yet.
    pub fn fence_value(&self) -> FenceValue {
        self.fence_value
    }

    /// The fence value recorded for a slot.
    /// # Panics
    /// * If `slot` is out of range.
    pub fn slot_value(&self, slot: SlotIndex) -> FenceValue {
        self.table.get(slot)
    }

    /// Read the GPU completion marker.
    pub fn completed_value(&self) -> Result<FenceValue> {
        self.waiter.completed_value()
    }

    /// Query whether a slot still has outstanding work, without blocking.
    pub fn slot_state(&self, slot: SlotIndex) -> Result<SlotState> {
        let value = self.table.get(slot);
        if value.is_zero() || self.waiter.completed_value()? >= value {
            Ok(SlotState::Idle)
        } else {
            Ok(SlotState::Pending(value))
        }
    }

    /// All slots that still have outstanding work, with the fence value each one waits on.
    pub fn pending_slots(&self) -> Result<Vec<(SlotIndex, FenceValue)>> {
        let completed = self.waiter.completed_value()?;
        Ok(self.table.iter().filter(|(_, value)| *value > completed).collect())
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn waiter(&self) -> &W {
        &self.waiter
    }
}

impl<Q: CommandQueue, W: CompletionWait> Drop for FrameSynchronizer<Q, W> {
    fn drop(&mut self) {
        // Waiting here could block forever on a lost device, so only report.
        match self.pending_slots() {
            Ok(pending) if !pending.is_empty() => warn!(
                "[{}] Frame synchronizer dropped with outstanding GPU work on slots {:?}. Call flush() before destroying frame resources.",
                self.name, pending
            ),
            Ok(_) => {}
            Err(err) => warn!("[{}] Could not query completion marker on drop: {}", self.name, err),
        }
    }
}

//! A host-side command queue and completion marker.
//!
//! [`CpuTimeline`] implements both [`CommandQueue`] and [`CompletionWait`] without a GPU. Submitted commands are
//! stored until a signal covers them, and the completion marker only advances when told to
//! (or immediately, with [`CompletionMode::Immediate`]). This makes it possible to run the frame loop headless
//! and to reproduce any interleaving of CPU recording and GPU completion deterministically.
//!
//! Blocking waits sit on a [`Condvar`] that is notified whenever the marker advances.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Result;
use ash::vk;
use static_assertions::assert_impl_all;

use crate::core::fence_value::FenceValue;
use crate::core::queue::{CommandQueue, CompletionWait, WaitStatus, WaitTimeout};
use crate::Error;

/// Controls when the completion marker of a [`CpuTimeline`] advances.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum CompletionMode {
    /// The marker only moves through [`CpuTimeline::complete_up_to()`] and friends.
    #[default]
    Manual,
    /// Every signaled value completes as soon as it is signaled.
    Immediate,
}

/// Commands covered by a single signal.
#[derive(Debug)]
struct Batch<C> {
    value: FenceValue,
    commands: Vec<C>,
}

#[derive(Debug)]
struct TimelineState<C> {
    mode: CompletionMode,
    completed: FenceValue,
    signaled: FenceValue,
    /// Submitted, but no signal was issued after them yet.
    unsignaled: Vec<C>,
    pending: VecDeque<Batch<C>>,
    device_lost: bool,
}

impl<C> TimelineState<C> {
    fn check_device(&self) -> Result<()> {
        if self.device_lost {
            Err(Error::VkError(vk::Result::ERROR_DEVICE_LOST).into())
        } else {
            Ok(())
        }
    }

    fn complete_up_to(&mut self, value: FenceValue) -> FenceValue {
        // Work can never complete before it was signaled.
        let value = value.min(self.signaled);
        if value > self.completed {
            self.completed = value;
            while self.pending.front().map_or(false, |batch| batch.value <= value) {
                self.pending.pop_front();
            }
            #[cfg(feature = "log-fences")]
            trace!("CPU timeline completed up to fence value {}", value);
        }
        self.completed
    }
}

#[derive(Debug)]
struct TimelineInner<C> {
    state: Mutex<TimelineState<C>>,
    advanced: Condvar,
}

/// A command queue whose GPU completion marker lives on the host. Cloning is cheap, all clones share the same timeline.
///
/// # Example
/// ```
/// use fencepost::prelude::*;
///
/// # fn main() -> anyhow::Result<()> {
/// let timeline = CpuTimeline::<&str>::new(CompletionMode::Manual);
/// timeline.submit("frame 1")?;
/// timeline.signal(FenceValue::new(1))?;
/// assert_eq!(timeline.in_flight()?, vec!["frame 1"]);
///
/// timeline.complete_up_to(FenceValue::new(1))?;
/// assert!(timeline.in_flight()?.is_empty());
/// assert_eq!(timeline.completed_value()?, FenceValue::new(1));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CpuTimeline<C = ()> {
    inner: Arc<TimelineInner<C>>,
}

assert_impl_all!(CpuTimeline<u32>: Send, Sync, Clone);

impl<C> Clone for CpuTimeline<C> {
    fn clone(&self) -> Self {
        CpuTimeline {
            inner: self.inner.clone(),
        }
    }
}

impl<C> Default for CpuTimeline<C> {
    fn default() -> Self {
        Self::new(CompletionMode::default())
    }
}

impl<C> CpuTimeline<C> {
    /// Create a new timeline. The completion marker starts at zero.
    pub fn new(mode: CompletionMode) -> Self {
        CpuTimeline {
            inner: Arc::new(TimelineInner {
                state: Mutex::new(TimelineState {
                    mode,
                    completed: FenceValue::ZERO,
                    signaled: FenceValue::ZERO,
                    unsignaled: vec![],
                    pending: VecDeque::new(),
                    device_lost: false,
                }),
                advanced: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, TimelineState<C>>> {
        Ok(self.inner.state.lock().map_err(|_| Error::PoisonError)?)
    }

    pub fn mode(&self) -> Result<CompletionMode> {
        Ok(self.lock()?.mode)
    }

    /// Change the completion mode. Switching to [`CompletionMode::Immediate`] completes everything signaled so far.
    pub fn set_mode(&self, mode: CompletionMode) -> Result<()> {
        let mut state = self.lock()?;
        state.mode = mode;
        if mode == CompletionMode::Immediate {
            let signaled = state.signaled;
            state.complete_up_to(signaled);
            self.inner.advanced.notify_all();
        }
        Ok(())
    }

    /// Advance the completion marker to `value`, retiring all work signaled up to it. The marker never moves backwards
    /// and never passes the highest signaled value. Returns the new marker.
    pub fn complete_up_to(&self, value: impl Into<FenceValue>) -> Result<FenceValue> {
        let mut state = self.lock()?;
        state.check_device()?;
        let completed = state.complete_up_to(value.into());
        self.inner.advanced.notify_all();
        Ok(completed)
    }

    /// Complete the oldest outstanding signal, if there is one.
    pub fn complete_next(&self) -> Result<Option<FenceValue>> {
        let mut state = self.lock()?;
        state.check_device()?;
        let Some(value) = state.pending.front().map(|batch| batch.value) else {
            return Ok(None);
        };
        state.complete_up_to(value);
        self.inner.advanced.notify_all();
        Ok(Some(value))
    }

    /// Complete everything signaled so far.
    pub fn complete_all(&self) -> Result<FenceValue> {
        let mut state = self.lock()?;
        state.check_device()?;
        let signaled = state.signaled;
        let completed = state.complete_up_to(signaled);
        self.inner.advanced.notify_all();
        Ok(completed)
    }

    /// The highest value signaled on this timeline.
    pub fn signaled_value(&self) -> Result<FenceValue> {
        Ok(self.lock()?.signaled)
    }

    /// Simulate a lost device. Every following call that talks to the "GPU" fails with
    /// `VK_ERROR_DEVICE_LOST`, and blocked waits are released with that error.
    pub fn lose_device(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.device_lost = true;
        self.inner.advanced.notify_all();
        warn!("CPU timeline lost its device at fence value {}", state.completed);
        Ok(())
    }
}

impl<C: Clone> CpuTimeline<C> {
    /// All submitted commands the GPU has not finished yet, in submission order.
    pub fn in_flight(&self) -> Result<Vec<C>> {
        let state = self.lock()?;
        Ok(state
            .pending
            .iter()
            .flat_map(|batch| batch.commands.iter().cloned())
            .chain(state.unsignaled.iter().cloned())
            .collect())
    }
}

impl<C: Send + 'static> CpuTimeline<C> {
    /// Advance the completion marker to `value` after `delay` from a separate thread, like a GPU finishing work
    /// while the CPU is blocked.
    pub fn complete_after(&self, value: impl Into<FenceValue>, delay: Duration) -> JoinHandle<Result<FenceValue>> {
        let timeline = self.clone();
        let value = value.into();
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            timeline.complete_up_to(value)
        })
    }
}

impl<C> CommandQueue for CpuTimeline<C> {
    type Commands = C;

    fn submit(&self, commands: C) -> Result<()> {
        let mut state = self.lock()?;
        state.check_device()?;
        state.unsignaled.push(commands);
        Ok(())
    }

    fn signal(&self, value: FenceValue) -> Result<()> {
        let mut state = self.lock()?;
        state.check_device()?;
        if value <= state.signaled {
            return Err(Error::Uncategorized("Fence values must be signaled in increasing order").into());
        }
        let commands = std::mem::take(&mut state.unsignaled);
        state.pending.push_back(Batch {
            value,
            commands,
        });
        state.signaled = value;
        if state.mode == CompletionMode::Immediate {
            state.complete_up_to(value);
            self.inner.advanced.notify_all();
        }
        Ok(())
    }
}

impl<C> CompletionWait for CpuTimeline<C> {
    fn completed_value(&self) -> Result<FenceValue> {
        let state = self.lock()?;
        state.check_device()?;
        Ok(state.completed)
    }

    fn wait_for_value(&self, value: FenceValue, timeout: WaitTimeout) -> Result<WaitStatus> {
        let state = self.lock()?;
        let blocked = |state: &mut TimelineState<C>| state.completed < value && !state.device_lost;
        let state = match timeout {
            WaitTimeout::Infinite => self
                .inner
                .advanced
                .wait_while(state, blocked)
                .map_err(|_| Error::PoisonError)?,
            WaitTimeout::Bounded(duration) => {
                self.inner
                    .advanced
                    .wait_timeout_while(state, duration, blocked)
                    .map_err(|_| Error::PoisonError)?
                    .0
            }
        };
        state.check_device()?;
        if state.completed >= value {
            Ok(WaitStatus::Ready)
        } else {
            Ok(WaitStatus::TimedOut)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_never_passes_signaled_value() -> Result<()> {
        let timeline = CpuTimeline::<()>::new(CompletionMode::Manual);
        timeline.signal(FenceValue::new(1))?;
        assert_eq!(timeline.complete_up_to(FenceValue::new(5))?, FenceValue::new(1));
        assert_eq!(timeline.complete_up_to(FenceValue::ZERO)?, FenceValue::new(1), "marker must not move backwards");
        Ok(())
    }

    #[test]
    fn signals_must_increase() -> Result<()> {
        let timeline = CpuTimeline::<()>::new(CompletionMode::Manual);
        timeline.signal(FenceValue::new(2))?;
        assert!(timeline.signal(FenceValue::new(2)).is_err());
        assert!(timeline.signal(FenceValue::new(1)).is_err());
        Ok(())
    }

    #[test]
    fn immediate_mode_completes_on_signal() -> Result<()> {
        let timeline = CpuTimeline::<u32>::new(CompletionMode::Immediate);
        timeline.submit(3)?;
        timeline.signal(FenceValue::new(1))?;
        assert_eq!(timeline.completed_value()?, FenceValue::new(1));
        assert!(timeline.in_flight()?.is_empty());
        Ok(())
    }

    #[test]
    fn switching_to_immediate_drains() -> Result<()> {
        let timeline = CpuTimeline::<u32>::new(CompletionMode::Manual);
        timeline.submit(1)?;
        timeline.signal(FenceValue::new(1))?;
        timeline.submit(2)?;
        timeline.signal(FenceValue::new(2))?;
        timeline.set_mode(CompletionMode::Immediate)?;
        assert_eq!(timeline.completed_value()?, FenceValue::new(2));
        Ok(())
    }

    #[test]
    fn complete_next_retires_in_order() -> Result<()> {
        let timeline = CpuTimeline::<u32>::new(CompletionMode::Manual);
        for value in 1..=3u32 {
            timeline.submit(value)?;
            timeline.signal(FenceValue::new(value as u64))?;
        }
        assert_eq!(timeline.complete_next()?, Some(FenceValue::new(1)));
        assert_eq!(timeline.in_flight()?, vec![2, 3]);
        assert_eq!(timeline.complete_next()?, Some(FenceValue::new(2)));
        assert_eq!(timeline.complete_next()?, Some(FenceValue::new(3)));
        assert_eq!(timeline.complete_next()?, None);
        Ok(())
    }

    #[test]
    fn lost_device_fails_calls() -> Result<()> {
        let timeline = CpuTimeline::<()>::new(CompletionMode::Manual);
        timeline.lose_device()?;
        let err = timeline.submit(()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::VkError(vk::Result::ERROR_DEVICE_LOST))
        ));
        assert!(timeline.wait_for_value(FenceValue::new(1), WaitTimeout::Infinite).is_err());
        Ok(())
    }
}

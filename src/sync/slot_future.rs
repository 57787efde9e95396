use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use anyhow::Result;
use futures::future::FusedFuture;

use crate::core::fence_value::FenceValue;
use crate::core::queue::CompletionWait;

/// Interval at which a pending [`SlotFuture`] re-polls the completion marker.
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Future that resolves once the GPU completion marker reaches a fence value. Obtained from
/// [`FrameSynchronizer::wait_for_slot_async()`](crate::FrameSynchronizer::wait_for_slot_async).
///
/// Errors from reading the completion marker are returned from the future.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct SlotFuture<'w, W: CompletionWait> {
    #[derivative(Debug = "ignore")]
    waiter: &'w W,
    value: FenceValue,
    done: bool,
}

impl<'w, W: CompletionWait> SlotFuture<'w, W> {
    pub(crate) fn new(waiter: &'w W, value: FenceValue) -> Self {
        SlotFuture {
            waiter,
            value,
            done: false,
        }
    }

    /// The fence value this future is waiting for.
    pub fn value(&self) -> FenceValue {
        self.value
    }
}

// Note that this works by periodically polling the completion marker, there is no way to get notified
// by the GPU without blocking a thread.
impl<'w, W: CompletionWait> std::future::Future for SlotFuture<'w, W> {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<Self::Output> {
        // A slot that was never used has nothing to wait for.
        if self.value.is_zero() {
            self.done = true;
            return Poll::Ready(Ok(()));
        }
        let completed = match self.waiter.completed_value() {
            Ok(completed) => completed,
            Err(err) => {
                self.done = true;
                return Poll::Ready(Err(err));
            }
        };

        if completed >= self.value {
            self.done = true;
            Poll::Ready(Ok(()))
        } else {
            let waker = ctx.waker().clone();
            std::thread::spawn(move || {
                std::thread::sleep(POLL_INTERVAL);
                waker.wake();
            });
            Poll::Pending
        }
    }
}

impl<'w, W: CompletionWait> FusedFuture for SlotFuture<'w, W> {
    fn is_terminated(&self) -> bool {
        self.done
    }
}

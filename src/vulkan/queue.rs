use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use ash::vk;

use crate::core::fence_value::FenceValue;
use crate::core::queue::{CommandQueue, CompletionWait, WaitStatus, WaitTimeout};
use crate::vulkan::semaphore::TimelineSemaphore;
use crate::Error;

/// A Vulkan queue paired with the timeline semaphore that acts as its fence.
///
/// Creating the device is up to the caller. The device must be created with Vulkan 1.3 and have the
/// `timelineSemaphore` and `synchronization2` features enabled.
///
/// Submissions to the underlying `VkQueue` are externally synchronized through a mutex, so the queue can be shared
/// between the frame synchronizer and other parts of the renderer.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct VulkanQueue {
    #[derivative(Debug = "ignore")]
    device: ash::Device,
    queue: Mutex<vk::Queue>,
    timeline: TimelineSemaphore,
}

impl VulkanQueue {
    /// Wrap a queue obtained from `device`. A new timeline semaphore is created for it with its counter at zero.
    pub fn new(device: ash::Device, queue: vk::Queue) -> Result<Self> {
        let timeline = TimelineSemaphore::new(device.clone(), FenceValue::ZERO)?;
        info!("Created timeline semaphore {:?} for queue {:?}", timeline, queue);
        Ok(VulkanQueue {
            device,
            queue: Mutex::new(queue),
            timeline,
        })
    }

    fn acquire_queue(&self) -> Result<MutexGuard<'_, vk::Queue>> {
        Ok(self.queue.lock().map_err(|_| Error::PoisonError)?)
    }

    fn submit2(&self, submit: &vk::SubmitInfo2) -> Result<()> {
        let queue = self.acquire_queue()?;
        // SAFETY: access to the queue is synchronized by the mutex, and all handles referenced by the submit
        // are kept alive by the caller until the submission completes.
        unsafe {
            self.device.queue_submit2(*queue, std::slice::from_ref(submit), vk::Fence::null())?;
        }
        Ok(())
    }

    /// Get the timeline semaphore used as this queue's fence, for example to make other submissions wait on it.
    pub fn timeline(&self) -> &TimelineSemaphore {
        &self.timeline
    }

    /// Obtain the raw vulkan handle of the queue.
    /// # Safety
    /// * Submitting to the handle directly bypasses the queue lock.
    pub unsafe fn handle(&self) -> Result<vk::Queue> {
        Ok(*self.acquire_queue()?)
    }
}

impl CommandQueue for VulkanQueue {
    type Commands = Vec<vk::CommandBuffer>;

    fn submit(&self, commands: Self::Commands) -> Result<()> {
        let command_buffers = commands
            .iter()
            .map(|&cmd| vk::CommandBufferSubmitInfo::builder().command_buffer(cmd).build())
            .collect::<Vec<_>>();
        let submit = vk::SubmitInfo2::builder().command_buffer_infos(&command_buffers);
        self.submit2(&submit)
    }

    fn signal(&self, value: FenceValue) -> Result<()> {
        // An empty submission that only signals. Queue submission order guarantees all earlier work
        // finishes before the semaphore reaches this value.
        let signal = vk::SemaphoreSubmitInfo::builder()
            // SAFETY: the semaphore is only ever signaled from here.
            .semaphore(unsafe { self.timeline.handle() })
            .value(value.get())
            .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
            .build();
        let submit = vk::SubmitInfo2::builder().signal_semaphore_infos(std::slice::from_ref(&signal));
        self.submit2(&submit)
    }
}

impl CompletionWait for VulkanQueue {
    fn completed_value(&self) -> Result<FenceValue> {
        Ok(self.timeline.value()?)
    }

    fn wait_for_value(&self, value: FenceValue, timeout: WaitTimeout) -> Result<WaitStatus> {
        if self.timeline.wait(value, timeout.as_nanos())? {
            Ok(WaitStatus::Ready)
        } else {
            Ok(WaitStatus::TimedOut)
        }
    }
}

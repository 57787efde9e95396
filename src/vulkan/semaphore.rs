use ash::prelude::VkResult;
use ash::vk;

use crate::core::fence_value::FenceValue;

/// Wrapper around a timeline [`VkSemaphore`](vk::Semaphore). A timeline semaphore carries a 64-bit counter that the GPU
/// sets when a submission signals it, and that the host can read or wait on. This is the Vulkan equivalent of a D3D12 fence.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct TimelineSemaphore {
    #[derivative(Debug = "ignore")]
    device: ash::Device,
    handle: vk::Semaphore,
}

impl TimelineSemaphore {
    /// Create a new timeline semaphore with the given initial counter value.
    pub fn new(device: ash::Device, initial_value: FenceValue) -> VkResult<Self> {
        let mut type_info = vk::SemaphoreTypeCreateInfo::builder()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(initial_value.get());
        let info = vk::SemaphoreCreateInfo::builder().push_next(&mut type_info);
        // SAFETY: Vulkan API call with a valid device and create info.
        let handle = unsafe { device.create_semaphore(&info, None)? };
        Ok(TimelineSemaphore {
            device,
            handle,
        })
    }

    /// Read the current counter value. Never blocks.
    pub fn value(&self) -> VkResult<FenceValue> {
        // SAFETY: the handle is valid for as long as self is alive.
        let value = unsafe { self.device.get_semaphore_counter_value(self.handle)? };
        Ok(FenceValue::new(value))
    }

    /// Block until the counter reaches `value` or `timeout_ns` nanoseconds elapse. Returns `Ok(false)` on timeout.
    pub fn wait(&self, value: FenceValue, timeout_ns: u64) -> VkResult<bool> {
        let semaphores = [self.handle];
        let values = [value.get()];
        let info = vk::SemaphoreWaitInfo::builder().semaphores(&semaphores).values(&values);
        // SAFETY: the handle is valid for as long as self is alive.
        match unsafe { self.device.wait_semaphores(&info, timeout_ns) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Get unsafe access to the underlying `VkSemaphore` object.
    /// # Safety
    /// * Signaling this semaphore outside of [`VulkanQueue`](crate::vulkan::VulkanQueue) breaks the fence counter's invariants.
    /// * The handle must not be destroyed.
    pub unsafe fn handle(&self) -> vk::Semaphore {
        self.handle
    }
}

impl Drop for TimelineSemaphore {
    fn drop(&mut self) {
        // SAFETY: the semaphore is no longer referenced by pending work, callers flush before dropping.
        unsafe {
            self.device.destroy_semaphore(self.handle, None);
        }
    }
}

//! Exposes all structs needed to store initialization parameters.

use crate::core::queue::WaitTimeout;

/// Number of frames in flight used when none is specified. A frame in-flight is a frame that is executing on
/// the GPU or scheduled to do so. With three frames in flight, the CPU can record up to two frames ahead of the GPU.
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 3;

/// Settings used to create a [`FrameSynchronizer`](crate::FrameSynchronizer) or [`FrameManager`](crate::FrameManager).
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Name used to identify this synchronizer in log output.
    pub name: String,
    /// Number of frames that may be in flight at the same time. Fixed for the lifetime of the synchronizer.
    pub frames_in_flight: usize,
    /// How long the frame loop is allowed to block while waiting for a frame slot to be retired.
    pub wait_timeout: WaitTimeout,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            name: String::from(""),
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            wait_timeout: WaitTimeout::Infinite,
        }
    }
}

/// The sync builder is a convenience struct to easily create [`SyncSettings`](crate::SyncSettings).
///
/// For information about each of the fields, see [`SyncSettings`](crate::SyncSettings)
/// # Example
/// ```
/// # use fencepost::*;
/// use std::time::Duration;
///
/// let settings = SyncBuilder::new()
///     .name("My renderer")
///     .frames_in_flight(2)
///     .wait_timeout(Duration::from_millis(500))
///     .build();
/// assert_eq!(settings.frames_in_flight, 2);
/// ```
#[derive(Debug, Default)]
pub struct SyncBuilder {
    inner: SyncSettings,
}

impl SyncBuilder {
    /// Create a new sync builder with default settings.
    pub fn new() -> Self {
        SyncBuilder {
            inner: SyncSettings::default(),
        }
    }

    /// Sets the name used in log output.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = name.into();
        self
    }

    /// Sets the number of frames in flight. Zero is rejected when the synchronizer is created.
    pub fn frames_in_flight(mut self, count: usize) -> Self {
        self.inner.frames_in_flight = count;
        self
    }

    /// Sets the wait policy for the frame loop. Accepts a [`Duration`](std::time::Duration) for a bounded wait,
    /// or [`WaitTimeout::Infinite`].
    pub fn wait_timeout(mut self, timeout: impl Into<WaitTimeout>) -> Self {
        self.inner.wait_timeout = timeout.into();
        self
    }

    /// Build the resulting settings.
    pub fn build(self) -> SyncSettings {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn defaults_match_three_buffered_infinite_wait() {
        let settings = SyncBuilder::new().build();
        assert_eq!(settings.frames_in_flight, DEFAULT_FRAMES_IN_FLIGHT);
        assert_eq!(settings.wait_timeout, WaitTimeout::Infinite);
    }

    #[test]
    fn duration_becomes_bounded_timeout() {
        let settings = SyncBuilder::new().wait_timeout(Duration::from_millis(16)).build();
        assert_eq!(settings.wait_timeout, WaitTimeout::Bounded(Duration::from_millis(16)));
    }
}

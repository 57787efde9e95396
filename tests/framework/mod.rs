#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Result;

use fencepost::{CompletionMode, CpuTimeline, FrameManager, FrameSynchronizer, SyncBuilder};

/// Commands submitted in tests are the index of the slot that recorded them.
pub type Timeline = CpuTimeline<usize>;

#[derive(Debug)]
pub struct Context {
    pub timeline: Timeline,
    pub sync: FrameSynchronizer<Timeline, Timeline>,
}

pub fn init_logging() {
    // Another test may have installed the logger already.
    let _ = pretty_env_logger::try_init();
}

/// Creates a synchronizer on a manually advanced timeline
pub fn make_context(frames_in_flight: usize) -> Result<Context> {
    init_logging();
    let timeline = Timeline::new(CompletionMode::Manual);
    let sync = FrameSynchronizer::new(timeline.clone(), timeline.clone(), frames_in_flight)?;
    Ok(Context {
        timeline,
        sync,
    })
}

/// Create a frame manager on a fresh timeline, and adjust the settings used for it
pub fn make_frame_manager<F: FnOnce(SyncBuilder) -> SyncBuilder>(
    mode: CompletionMode,
    callback: F,
) -> Result<(Timeline, FrameManager<Timeline, Timeline>)> {
    init_logging();
    let timeline = Timeline::new(mode);
    let settings = callback(SyncBuilder::new().name("fencepost test framework")).build();
    let frame = FrameManager::new(timeline.clone(), timeline.clone(), &settings)?;
    Ok((timeline, frame))
}

/// Completes one signaled batch at a time on a background thread, like a GPU working through its queue.
pub struct GpuThread {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

pub fn spawn_gpu(timeline: Timeline, interval: Duration) -> GpuThread {
    let stop = Arc::new(AtomicBool::new(false));
    let handle = {
        let stop = stop.clone();
        std::thread::spawn(move || {
            while !stop.load(Ordering::Acquire) {
                // Errors only happen on a lost device, in which case there is nothing left to complete.
                let _ = timeline.complete_next();
                std::thread::sleep(interval);
            }
        })
    };
    GpuThread {
        stop,
        handle: Some(handle),
    }
}

impl Drop for GpuThread {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.join().expect("GPU thread panicked");
        }
    }
}

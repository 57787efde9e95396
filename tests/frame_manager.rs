use std::time::Duration;

use anyhow::{anyhow, Result};

use fencepost::prelude::*;

mod framework;

/// Stands in for a swap chain, remembering which slots were presented.
#[derive(Debug, Default)]
struct RecordingSwapchain {
    presented: Vec<InFlightContext>,
}

impl Present for RecordingSwapchain {
    fn present(&mut self, ifc: &InFlightContext) -> Result<()> {
        self.presented.push(*ifc);
        Ok(())
    }
}

#[test]
pub fn frames_rotate_through_slots() -> Result<()> {
    let (_timeline, mut frame) = framework::make_frame_manager(CompletionMode::Immediate, |s| s.frames_in_flight(3))?;
    let mut swapchain = RecordingSwapchain::default();
    let mut values = vec![];
    for _ in 0..6 {
        match frame.new_frame(|ifc| Ok(ifc.slot), &mut swapchain)? {
            FrameOutcome::Presented { value, .. } => values.push(value.get()),
            outcome => panic!("unexpected outcome {:?}", outcome),
        }
    }
    let slots = swapchain.presented.iter().map(|ifc| ifc.slot).collect::<Vec<_>>();
    assert_eq!(slots, vec![1, 2, 0, 1, 2, 0]);
    let frames = swapchain.presented.iter().map(|ifc| ifc.frame).collect::<Vec<_>>();
    assert_eq!(frames, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(values, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(frame.frame_count(), 6);
    // The fourth frame reuses slot 1, which was last fenced with value 1.
    assert_eq!(swapchain.presented[3].retired_value, FenceValue::new(1));
    assert_eq!(swapchain.presented[0].retired_value, FenceValue::ZERO);
    Ok(())
}

#[test]
pub fn stalled_slot_is_reported_and_retried() -> Result<()> {
    let (timeline, mut frame) = framework::make_frame_manager(CompletionMode::Manual, |s| {
        s.frames_in_flight(2).wait_timeout(Duration::from_millis(5))
    })?;
    let mut present = |_: &InFlightContext| -> Result<()> { Ok(()) };

    frame.new_frame(|ifc| Ok(ifc.slot), &mut present)?;
    frame.new_frame(|ifc| Ok(ifc.slot), &mut present)?;

    // Slot 1 is still waiting on the first frame.
    let outcome = frame.new_frame(|_| -> Result<usize> { panic!("recorded a slot that is still in flight") }, &mut present)?;
    assert_eq!(
        outcome,
        FrameOutcome::Stalled {
            slot: 1,
            waiting_for: FenceValue::new(1),
        }
    );
    assert_eq!(frame.frame_count(), 2);
    assert_eq!(timeline.signaled_value()?, FenceValue::new(2), "a stalled frame must not submit");

    timeline.complete_next()?;
    let outcome = frame.new_frame(|ifc| Ok(ifc.slot), &mut present)?;
    assert_eq!(
        outcome,
        FrameOutcome::Presented {
            slot: 1,
            value: FenceValue::new(3),
        }
    );
    Ok(())
}

#[test]
pub fn never_records_in_flight_slot_with_concurrent_gpu() -> Result<()> {
    let (timeline, mut frame) = framework::make_frame_manager(CompletionMode::Manual, |s| s.frames_in_flight(2))?;
    let mut present = |_: &InFlightContext| -> Result<()> { Ok(()) };
    {
        let _gpu = framework::spawn_gpu(timeline.clone(), Duration::from_micros(200));
        for _ in 0..40 {
            frame.new_frame(
                |ifc| {
                    assert!(
                        !timeline.in_flight()?.contains(&ifc.slot),
                        "slot {} recorded while still in flight",
                        ifc.slot
                    );
                    Ok(ifc.slot)
                },
                &mut present,
            )?;
        }
        frame.flush()?;
    }
    assert!(timeline.in_flight()?.is_empty());
    assert_eq!(timeline.completed_value()?, frame.synchronizer().fence_value());
    Ok(())
}

#[test]
pub fn record_error_submits_nothing() -> Result<()> {
    let (timeline, mut frame) = framework::make_frame_manager(CompletionMode::Immediate, |s| s)?;
    let mut swapchain = RecordingSwapchain::default();
    let err = frame
        .new_frame(|_| -> Result<usize> { Err(anyhow!("command recording failed")) }, &mut swapchain)
        .unwrap_err();
    assert_eq!(err.to_string(), "command recording failed");
    assert_eq!(timeline.signaled_value()?, FenceValue::ZERO);
    assert!(swapchain.presented.is_empty());
    assert_eq!(frame.frame_count(), 0);

    // The slot was not used up, the next frame records into it.
    let outcome = frame.new_frame(|ifc| Ok(ifc.slot), &mut swapchain)?;
    assert_eq!(
        outcome,
        FrameOutcome::Presented {
            slot: 1,
            value: FenceValue::new(1),
        }
    );
    assert_eq!(frame.synchronizer().current_slot(), 1);
    Ok(())
}

#[test]
pub fn submit_error_keeps_slot() -> Result<()> {
    let (timeline, mut frame) = framework::make_frame_manager(CompletionMode::Manual, |s| s.frames_in_flight(2))?;
    let mut swapchain = RecordingSwapchain::default();
    timeline.lose_device()?;
    assert!(frame.new_frame(|ifc| Ok(ifc.slot), &mut swapchain).is_err());
    assert_eq!(frame.synchronizer().current_slot(), 0);
    assert!(swapchain.presented.is_empty());
    Ok(())
}

#[test]
pub fn present_error_is_propagated() -> Result<()> {
    let (timeline, mut frame) = framework::make_frame_manager(CompletionMode::Immediate, |s| s)?;
    let mut present = |_: &InFlightContext| -> Result<()> { Err(anyhow!("swap chain out of date")) };
    let err = frame.new_frame(|ifc| Ok(ifc.slot), &mut present).unwrap_err();
    assert_eq!(err.to_string(), "swap chain out of date");
    // The frame was submitted before presenting, so its fence is live.
    assert_eq!(timeline.signaled_value()?, FenceValue::new(1));
    Ok(())
}

#[test]
pub fn lost_device_is_propagated() -> Result<()> {
    let (timeline, mut frame) = framework::make_frame_manager(CompletionMode::Manual, |s| s.frames_in_flight(2))?;
    let mut present = |_: &InFlightContext| -> Result<()> { Ok(()) };
    frame.new_frame(|ifc| Ok(ifc.slot), &mut present)?;
    timeline.lose_device()?;
    let err = frame.new_frame(|ifc| Ok(ifc.slot), &mut present).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::VkError(vk::Result::ERROR_DEVICE_LOST))
    ));
    Ok(())
}

#[test]
pub fn wait_timeout_can_be_changed() -> Result<()> {
    let (_timeline, mut frame) = framework::make_frame_manager(CompletionMode::Immediate, |s| s)?;
    assert_eq!(frame.wait_timeout(), WaitTimeout::Infinite);
    frame.set_wait_timeout(Duration::from_millis(1));
    assert_eq!(frame.wait_timeout(), WaitTimeout::Bounded(Duration::from_millis(1)));
    Ok(())
}

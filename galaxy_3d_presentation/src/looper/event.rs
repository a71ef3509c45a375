/// Typed messages delivered to the owning loop
///
/// Collaborators that finish work on other threads never touch engine state
/// directly: they post one of these through a [`super::LoopProxy`] and the
/// engine handles it on its own thread.

use std::sync::mpsc::Sender;
use crate::device::{DeviceQueue, FenceId};
use crate::frame::FrameId;
use crate::options::UpdateConstraintsFlags;
use crate::timing::FrameTiming;

// ===== TIMERS =====

/// Identifier of a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub(crate) u64);

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Retry a swapchain image acquisition that timed out
    AcquireRetry,
    /// Present a frame held until its present window
    ScheduledPresent(FrameId),
}

// ===== EVENTS =====

/// Message processed by the presentation engine on its loop thread
#[derive(Debug)]
pub enum EngineEvent {
    /// Window finished preparing per-frame platform data
    FrameDataAcquired { frame: FrameId },
    /// Frame queue submitted the frame's commands to the GPU
    QueueSubmitted { frame: FrameId },
    /// Frame queue produced (or failed to produce) the output image
    FrameOutput { frame: FrameId, image_index: Option<u32>, success: bool },
    /// Frame queue finished the frame
    FrameComplete { frame: FrameId, timing: FrameTiming },
    /// A fence armed by a swapchain acquire was signaled
    FenceSignaled { fence: FenceId, success: bool },
    /// Device granted a present-capable queue for a frame
    QueueAcquired { frame: FrameId, queue: DeviceQueue },
    /// Device could not grant a queue for a frame
    QueueAcquireFailed { frame: FrameId },
    /// Platform vsync tick
    DisplayLink,
    /// Swapchain constraints changed (resize, format, fullscreen)
    UpdateConstraints { flags: UpdateConstraintsFlags, reply: Option<Sender<bool>> },
    /// Host requests the next on-demand frame
    ReadyForNextFrame,
    /// Deferred swapchain rebuild
    RecreateSwapchain,
    /// Deferred presentation of a completed frame
    Present { frame: FrameId },
    /// Stop the engine
    End,
    /// A timer fired
    Timer { id: TimerId, kind: TimerKind },
}

/// Frame queue collaborator - executes the render graph for a frame
///
/// The engine builds a [`FrameRequest`] per frame, hands it to the queue with
/// [`FrameQueue::make_frame`] and later binds the acquired image with
/// [`FrameQueue::set_render_target`]. The queue reports progress through the
/// request's [`FrameNotifier`], from whatever thread finishes the work.
/// Frames submitted by the host directly carry a channel notifier instead.

use std::sync::mpsc;
use crate::device::Semaphore;
use crate::frame::FrameId;
use crate::info::{Extent2, FrameConstraints};
use crate::looper::{EngineEvent, LoopProxy};
use crate::timing::FrameTiming;

// ===== HANDLES =====

/// Frame accepted by the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHandle {
    /// Submission order assigned by the queue
    pub order: u64,
}

/// Image the frame queue renders into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    /// Acquired swapchain image
    Swapchain {
        swapchain: u64,
        image_index: u32,
        /// Wait before writing (acquisition complete)
        wait: Option<Semaphore>,
        /// Signal when rendering finished (presentation waits on it)
        signal: Option<Semaphore>,
        extent: Extent2,
    },
    /// Queue-owned offscreen image
    Offscreen { extent: Extent2 },
}

// ===== NOTIFIER =====

/// Progress report of a frame submitted outside the presentation lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameReport {
    Submitted,
    Output { image_index: Option<u32>, success: bool },
    Complete(FrameTiming),
}

#[derive(Debug, Clone)]
enum NotifierTarget {
    /// Presentation frame registered with the engine
    Engine { frame: FrameId, proxy: LoopProxy },
    /// Caller-owned receiver
    Channel(mpsc::Sender<FrameReport>),
}

/// Progress reporting channel from the frame queue back to its submitter
#[derive(Debug, Clone)]
pub struct FrameNotifier {
    target: NotifierTarget,
}

impl FrameNotifier {
    pub(crate) fn new(frame: FrameId, proxy: LoopProxy) -> Self {
        Self { target: NotifierTarget::Engine { frame, proxy } }
    }

    /// Notifier reporting into a receiver owned by the caller
    ///
    /// Used for frames submitted with
    /// [`crate::engine::PresentationEngine::submit_next_frame`].
    pub fn channel() -> (Self, mpsc::Receiver<FrameReport>) {
        let (sender, receiver) = mpsc::channel();
        (Self { target: NotifierTarget::Channel(sender) }, receiver)
    }

    /// Engine frame the reports belong to, if any
    pub fn frame(&self) -> Option<FrameId> {
        match &self.target {
            NotifierTarget::Engine { frame, .. } => Some(*frame),
            NotifierTarget::Channel(_) => None,
        }
    }

    /// Commands were submitted to the GPU
    pub fn queue_submitted(&self) -> bool {
        self.send(FrameReport::Submitted)
    }

    /// Output image is rendered (`success = false` on failure)
    ///
    /// `image_index` names the swapchain image written, if any.
    pub fn output_ready(&self, image_index: Option<u32>, success: bool) -> bool {
        self.send(FrameReport::Output { image_index, success })
    }

    /// Frame finished on the queue
    pub fn complete(&self, timing: FrameTiming) -> bool {
        self.send(FrameReport::Complete(timing))
    }

    fn send(&self, report: FrameReport) -> bool {
        match &self.target {
            NotifierTarget::Engine { frame, proxy } => {
                let frame = *frame;
                proxy.post(match report {
                    FrameReport::Submitted => EngineEvent::QueueSubmitted { frame },
                    FrameReport::Output { image_index, success } => {
                        EngineEvent::FrameOutput { frame, image_index, success }
                    }
                    FrameReport::Complete(timing) => EngineEvent::FrameComplete { frame, timing },
                })
            }
            NotifierTarget::Channel(sender) => sender.send(report).is_ok(),
        }
    }
}

// ===== REQUEST =====

/// Everything the frame queue needs to render one frame
#[derive(Debug, Clone)]
pub struct FrameRequest {
    pub constraints: FrameConstraints,
    /// Output attachment the image is bound to
    pub output: String,
    /// Known at submission for offscreen frames or pre-acquired images
    pub render_target: Option<RenderTarget>,
    pub notifier: FrameNotifier,
}

// ===== QUEUE =====

/// Render graph executor consumed by the engine
pub trait FrameQueue {
    /// Queue name for diagnostics
    fn name(&self) -> &str;

    /// Output attachment presented directly to the swapchain, if any
    fn present_image_output(&self) -> Option<String>;

    /// Output attachment copied into the swapchain image, if any
    fn transfer_image_output(&self) -> Option<String>;

    /// Accept a frame for rendering
    ///
    /// Returns `None` if the queue refuses the frame.
    fn make_frame(&mut self, request: FrameRequest, priority: u32) -> Option<FrameHandle>;

    /// Bind the render target of a submitted frame
    fn set_render_target(&mut self, order: u64, target: RenderTarget);

    /// Drop a submitted frame
    fn cancel_frame(&mut self, order: u64);
}

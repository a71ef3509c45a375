/// Device trait - queue access for presentation

use bitflags::bitflags;
use crate::frame::FrameId;
use crate::looper::{EngineEvent, LoopProxy};

bitflags! {
    /// Capabilities a device queue must provide
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct QueueFlags: u32 {
        const GRAPHICS = 1 << 0;
        const COMPUTE = 1 << 1;
        const TRANSFER = 1 << 2;
        const PRESENT = 1 << 3;
    }
}

/// Queue leased from a [`Device`]
///
/// Must be handed back with [`Device::release_queue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceQueue {
    pub index: u32,
    pub flags: QueueFlags,
}

/// Pending asynchronous queue acquisition for one frame
///
/// The device keeps the request until a queue frees up, then calls
/// [`QueueRequest::complete`] (or [`QueueRequest::fail`]) from any thread.
#[derive(Debug, Clone)]
pub struct QueueRequest {
    frame: FrameId,
    proxy: LoopProxy,
}

impl QueueRequest {
    pub(crate) fn new(frame: FrameId, proxy: LoopProxy) -> Self {
        Self { frame, proxy }
    }

    /// Frame that waits for the queue
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Hand the queue to the waiting frame
    pub fn complete(self, queue: DeviceQueue) -> bool {
        self.proxy.post(EngineEvent::QueueAcquired { frame: self.frame, queue })
    }

    /// Report that no queue can be provided
    pub fn fail(self) -> bool {
        self.proxy.post(EngineEvent::QueueAcquireFailed { frame: self.frame })
    }
}

/// GPU device as seen by the presentation engine
///
/// Queue leasing only: command recording and submission belong to the
/// frame queue.
pub trait Device {
    /// Lease a queue with `flags` if one is idle right now
    fn try_acquire_queue(&self, flags: QueueFlags) -> Option<DeviceQueue>;

    /// Lease a queue with `flags` as soon as one becomes idle
    ///
    /// Completion is reported through `request`.
    fn acquire_queue(&self, flags: QueueFlags, request: QueueRequest);

    /// Return a leased queue
    fn release_queue(&self, queue: DeviceQueue);

    /// Block until all submitted GPU work finished
    fn wait_idle(&self);
}

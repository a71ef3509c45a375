/// GPU synchronization handles used by swapchain acquisition and presentation

use crate::looper::{EngineEvent, LoopProxy};

/// Identifier of an engine fence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FenceId(pub u64);

/// GPU-to-CPU fence armed by a swapchain acquire
///
/// The backend signals it (possibly from another thread) once the acquired
/// image is ready; the signal is delivered to the engine loop as
/// [`EngineEvent::FenceSignaled`].
#[derive(Debug, Clone)]
pub struct Fence {
    id: FenceId,
    proxy: LoopProxy,
}

impl Fence {
    pub(crate) fn new(id: FenceId, proxy: LoopProxy) -> Self {
        Self { id, proxy }
    }

    pub fn id(&self) -> FenceId {
        self.id
    }

    /// Signal the fence; `success = false` reports a failed wait
    pub fn signal(&self, success: bool) -> bool {
        self.proxy.post(EngineEvent::FenceSignaled { fence: self.id, success })
    }
}

/// GPU-to-GPU semaphore created by a swapchain backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Semaphore {
    id: u64,
}

impl Semaphore {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

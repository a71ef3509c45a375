/// EngineProxy - cross-thread entry points into a running engine
///
/// The engine itself is owned by its loop thread. Hosts that react to window
/// events elsewhere (resize, vsync, redraw requests) post typed messages
/// through this proxy instead.

use std::sync::mpsc;
use std::time::Duration;
use crate::looper::{EngineEvent, LoopProxy};
use crate::options::UpdateConstraintsFlags;

#[derive(Debug, Clone)]
pub struct EngineProxy {
    proxy: LoopProxy,
    wait_timeout: Duration,
}

impl EngineProxy {
    pub(crate) fn new(proxy: LoopProxy, wait_timeout: Duration) -> Self {
        Self { proxy, wait_timeout }
    }

    /// Request a swapchain rebuild
    ///
    /// Returns false if the engine no longer exists.
    pub fn update_constraints(&self, flags: UpdateConstraintsFlags) -> bool {
        self.proxy.post(EngineEvent::UpdateConstraints { flags, reply: None })
    }

    /// Request a swapchain rebuild and wait for its outcome
    ///
    /// Blocks until the rebuild finished or `wait_timeout` elapsed. Must not
    /// be called from the engine's own thread.
    pub fn update_constraints_sync(&self, flags: UpdateConstraintsFlags) -> bool {
        let (reply, result) = mpsc::channel();
        if !self.proxy.post(EngineEvent::UpdateConstraints { flags, reply: Some(reply) }) {
            return false;
        }
        result.recv_timeout(self.wait_timeout).unwrap_or(false)
    }

    /// Request the next on-demand frame
    pub fn set_ready_for_next_frame(&self) -> bool {
        self.proxy.post(EngineEvent::ReadyForNextFrame)
    }

    /// Forward a platform vsync tick
    pub fn display_link(&self) -> bool {
        self.proxy.post(EngineEvent::DisplayLink)
    }

    /// Stop the engine
    pub fn end(&self) -> bool {
        self.proxy.post(EngineEvent::End)
    }
}

#[cfg(test)]
#[path = "engine_proxy_tests.rs"]
mod tests;

/// PresentationFrame - lifecycle of one produced image
///
/// A frame binds to the engine's swapchain at creation, gets its output
/// wired into a [`FrameRequest`], is submitted to the frame queue, receives
/// an acquired swapchain image and is finally presented or invalidated.
/// The completion callback fires exactly once: `true` on presentation,
/// `false` on invalidation.

use std::fmt;
use std::sync::Arc;
use crate::error::{Error, Result};
use crate::frame_queue::{FrameHandle, FrameNotifier, FrameQueue, FrameRequest, RenderTarget};
use crate::info::{Extent2, FrameConstraints};
use crate::status::Status;
use crate::swapchain::{AcquiredImage, Swapchain, SwapchainImage};
use crate::engine_error;
use super::flags::{FrameFlags, FrameFlagSet};

/// Completion callback: `(frame, success)`
pub type FrameCallback = Box<dyn FnOnce(&PresentationFrame, bool)>;

/// Image a frame renders into
#[derive(Debug)]
pub enum FrameTarget {
    Swapchain(SwapchainImage),
    Offscreen { extent: Extent2 },
}

pub struct PresentationFrame {
    order: u64,
    flags: FrameFlagSet,
    status: Status,
    constraints: FrameConstraints,
    swapchain: Option<Arc<Swapchain>>,
    target: Option<FrameTarget>,
    output: Option<String>,
    handle: Option<FrameHandle>,
    callback: Option<FrameCallback>,
}

impl fmt::Debug for PresentationFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentationFrame")
            .field("order", &self.order)
            .field("flags", &self.flags.bits())
            .field("status", &self.status)
            .field("swapchain", &self.swapchain.as_ref().map(|s| s.id()))
            .field("handle", &self.handle)
            .finish()
    }
}

impl PresentationFrame {
    /// Create a frame bound to `swapchain`
    ///
    /// Only `INIT_FLAGS` and `CORRECTABLE_FRAME` are taken from `flags`.
    /// Fails without a swapchain unless the frame renders offscreen.
    ///
    /// # Arguments
    ///
    /// * `swapchain` - Engine's current swapchain
    /// * `constraints` - Output constraints; the extent follows the swapchain images
    /// * `order` - Expected frame order
    /// * `flags` - Creation flags
    /// * `callback` - Completion callback
    pub fn new(
        swapchain: Option<Arc<Swapchain>>,
        mut constraints: FrameConstraints,
        order: u64,
        flags: FrameFlags,
        callback: Option<FrameCallback>,
    ) -> Result<Self> {
        let flags = flags & (FrameFlags::INIT_FLAGS | FrameFlags::CORRECTABLE_FRAME);

        let target = if flags.contains(FrameFlags::OFFSCREEN_TARGET) {
            FrameTarget::Offscreen { extent: constraints.extent }
        } else {
            let Some(swapchain) = swapchain.as_ref() else {
                return Err(Error::SwapchainUnavailable);
            };
            let mut image = SwapchainImage::new(Arc::clone(swapchain), order);
            image.set_ready(false);
            constraints.extent = swapchain.image_info().extent;
            FrameTarget::Swapchain(image)
        };

        Ok(Self {
            order,
            flags: FrameFlagSet::new(flags),
            status: Status::Ok,
            constraints,
            swapchain,
            target: Some(target),
            output: None,
            handle: None,
            callback,
        })
    }

    pub fn order(&self) -> u64 {
        self.order
    }

    pub fn flags(&self) -> FrameFlags {
        self.flags.bits()
    }

    pub fn has_flag(&self, flag: FrameFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_invalidated(&self) -> bool {
        self.flags.is_invalidated()
    }

    pub fn is_offscreen(&self) -> bool {
        self.flags.contains(FrameFlags::OFFSCREEN_TARGET)
    }

    /// Presentation result
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn constraints(&self) -> &FrameConstraints {
        &self.constraints
    }

    /// Swapchain the frame is bound to (`None` once invalidated)
    pub fn swapchain(&self) -> Option<&Arc<Swapchain>> {
        self.swapchain.as_ref()
    }

    /// Whether the frame is bound to `swapchain`
    pub fn is_bound_to(&self, swapchain: Option<&Arc<Swapchain>>) -> bool {
        match (self.swapchain.as_ref(), swapchain) {
            (Some(own), Some(other)) => own.id() == other.id(),
            _ => false,
        }
    }

    pub fn swapchain_image(&self) -> Option<&SwapchainImage> {
        match self.target.as_ref() {
            Some(FrameTarget::Swapchain(image)) => Some(image),
            _ => None,
        }
    }

    pub fn swapchain_image_mut(&mut self) -> Option<&mut SwapchainImage> {
        match self.target.as_mut() {
            Some(FrameTarget::Swapchain(image)) => Some(image),
            _ => None,
        }
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn handle(&self) -> Option<FrameHandle> {
        self.handle
    }

    /// Detach the queue handle so the caller can cancel it
    pub fn take_handle(&mut self) -> Option<FrameHandle> {
        self.handle.take()
    }

    /// Current render target, if already known
    pub fn render_target(&self) -> Option<RenderTarget> {
        match self.target.as_ref()? {
            FrameTarget::Swapchain(image) => {
                let swapchain = image.swapchain()?;
                Some(RenderTarget::Swapchain {
                    swapchain: swapchain.id(),
                    image_index: image.image_index()?,
                    wait: image.wait_semaphore().cloned(),
                    signal: image.signal_semaphore().cloned(),
                    extent: swapchain.image_info().extent,
                })
            }
            FrameTarget::Offscreen { extent } => Some(RenderTarget::Offscreen { extent: *extent }),
        }
    }

    /// Pick the queue's output attachment
    ///
    /// Prefers the present output, falls back to the transfer output.
    pub fn setup_output_attachment(&mut self, queue: &dyn FrameQueue) -> Option<String> {
        if self.is_invalidated() {
            return None;
        }
        let output = queue
            .present_image_output()
            .or_else(|| queue.transfer_image_output());
        self.output = output.clone();
        self.flags.insert(FrameFlags::INPUT_ACQUIRED);
        output
    }

    /// Hand the frame request to the queue
    ///
    /// Adopts the order assigned by the queue.
    pub fn submit_frame(
        &mut self,
        queue: &mut dyn FrameQueue,
        notifier: FrameNotifier,
    ) -> Option<FrameHandle> {
        if self.is_invalidated() {
            return None;
        }
        let output = self.output.clone()?;

        let request = FrameRequest {
            constraints: self.constraints,
            output,
            render_target: self.render_target(),
            notifier,
        };

        let handle = queue.make_frame(request, 0)?;

        self.order = handle.order;
        if let Some(image) = self.swapchain_image_mut() {
            image.set_order(handle.order);
        }
        self.handle = Some(handle);
        self.flags.insert(FrameFlags::FRAME_SUBMITTED);
        Some(handle)
    }

    /// Record that the frame waits for a swapchain image
    pub fn set_image_requested(&mut self) {
        if !self.is_invalidated() {
            self.flags.insert(FrameFlags::SWAPCHAIN_IMAGE_ACQUIRED);
        }
    }

    /// Bind an acquired image
    ///
    /// Rejects images from any swapchain other than the frame's own.
    pub fn assign_swapchain_image(&mut self, acquired: &AcquiredImage, acquisition_time: u64) -> bool {
        if self.is_invalidated() {
            return false;
        }

        if !self.is_bound_to(Some(&acquired.swapchain)) {
            engine_error!(
                "galaxy3d::PresentationFrame",
                "Image swapchain and frame swapchain are different"
            );
            return false;
        }

        let Some(image) = self.swapchain_image_mut() else {
            return false;
        };

        image.set_image(acquired, acquisition_time);
        image.set_ready(true);
        self.flags.insert(FrameFlags::IMAGE_ACQUIRED);
        true
    }

    /// Record the rendered output
    ///
    /// `image_index` must match the bound swapchain image when both are known.
    pub fn assign_result(&mut self, image_index: Option<u32>) -> bool {
        if self.is_invalidated() {
            return false;
        }

        if let (Some(image), Some(index)) = (self.swapchain_image(), image_index) {
            if image.image_index() != Some(index) {
                engine_error!("galaxy3d::PresentationFrame", "Target already assigned");
                return false;
            }
        }

        self.flags.insert(FrameFlags::IMAGE_RENDERED);
        true
    }

    pub fn set_submitted(&mut self) {
        if !self.is_invalidated() {
            self.flags.insert(FrameFlags::QUEUE_SUBMITTED);
        }
    }

    /// Mark the frame presented and fire the callback with `true`
    pub fn set_presented(&mut self, status: Status) -> bool {
        if self.is_invalidated() {
            return false;
        }
        self.flags.insert(FrameFlags::IMAGE_PRESENTED);
        self.status = status;
        if let Some(callback) = self.callback.take() {
            callback(self, true);
        }
        true
    }

    /// Drop the frame
    ///
    /// Returns false if it was already invalidated. Gives the swapchain image
    /// back, fires the callback with `false` and releases the swapchain.
    pub fn invalidate(&mut self) -> bool {
        if self.is_invalidated() {
            return false;
        }

        self.flags.insert(FrameFlags::INVALIDATED);

        if let Some(image) = self.swapchain_image_mut() {
            image.invalidate_image();
        }

        if let Some(callback) = self.callback.take() {
            callback(self, false);
        }

        self.swapchain = None;
        self.target = None;
        self.output = None;
        true
    }
}

#[cfg(test)]
#[path = "presentation_frame_tests.rs"]
mod tests;

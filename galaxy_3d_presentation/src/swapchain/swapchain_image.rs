/// SwapchainImage - one frame's presentable target
///
/// Created unbound (state `Initial`) when a frame is scheduled, bound to an
/// acquired image by [`SwapchainImage::set_image`], then either presented or
/// invalidated. Dropping an image that was never presented returns it to the
/// swapchain.

use std::sync::Arc;
use crate::device::Semaphore;
use crate::info::ImageInfo;
use super::swapchain::{AcquiredImage, Swapchain};

/// Lifecycle state of a swapchain image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwapchainImageState {
    /// No image bound yet
    #[default]
    Initial,
    /// Image bound, awaiting presentation
    Submitted,
    /// Presented or given back
    Presented,
}

#[derive(Debug)]
pub struct SwapchainImage {
    state: SwapchainImageState,
    order: u64,
    swapchain: Option<Arc<Swapchain>>,
    image_index: Option<u32>,
    /// Signaled by the acquisition, waited on by rendering
    wait_semaphore: Option<Semaphore>,
    /// Signaled by rendering, waited on by presentation
    signal_semaphore: Option<Semaphore>,
    ready: bool,
    acquisition_time: u64,
}

impl SwapchainImage {
    /// Unbound image for a frame rendering into `swapchain`
    pub fn new(swapchain: Arc<Swapchain>, order: u64) -> Self {
        Self {
            state: SwapchainImageState::Initial,
            order,
            swapchain: Some(swapchain),
            image_index: None,
            wait_semaphore: None,
            signal_semaphore: None,
            ready: false,
            acquisition_time: 0,
        }
    }

    pub fn state(&self) -> SwapchainImageState {
        self.state
    }

    pub fn order(&self) -> u64 {
        self.order
    }

    pub fn set_order(&mut self, order: u64) {
        self.order = order;
    }

    pub fn swapchain(&self) -> Option<&Arc<Swapchain>> {
        self.swapchain.as_ref()
    }

    pub fn image_index(&self) -> Option<u32> {
        self.image_index
    }

    pub fn wait_semaphore(&self) -> Option<&Semaphore> {
        self.wait_semaphore.as_ref()
    }

    pub fn signal_semaphore(&self) -> Option<&Semaphore> {
        self.signal_semaphore.as_ref()
    }

    /// Image bound and usable as render target
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn acquisition_time(&self) -> u64 {
        self.acquisition_time
    }

    /// Bound and awaiting presentation
    pub fn is_submitted(&self) -> bool {
        self.state == SwapchainImageState::Submitted
    }

    /// Description of the underlying image
    pub fn info(&self) -> ImageInfo {
        self.swapchain
            .as_ref()
            .map(|swapchain| *swapchain.image_info())
            .unwrap_or_default()
    }

    /// Bind an acquired image
    ///
    /// Takes a render-complete semaphore from the swapchain pool.
    pub fn set_image(&mut self, acquired: &AcquiredImage, acquisition_time: u64) {
        let swapchain = Arc::clone(&acquired.swapchain);
        self.signal_semaphore = Some(swapchain.acquire_semaphore());
        self.wait_semaphore = acquired.semaphore.clone();
        self.image_index = Some(acquired.image_index);
        self.swapchain = Some(swapchain);
        self.acquisition_time = acquisition_time;
        self.state = SwapchainImageState::Submitted;
    }

    pub fn set_presented(&mut self) {
        self.state = SwapchainImageState::Presented;
    }

    /// Detach from the swapchain without waiting for the GPU
    ///
    /// A bound, unpresented image is given back to the swapchain and its
    /// semaphores are parked for deferred release.
    pub fn invalidate_image(&mut self) {
        if self.state != SwapchainImageState::Presented {
            if let (Some(swapchain), Some(index)) = (self.swapchain.as_ref(), self.image_index) {
                swapchain.invalidate_image(index, self.wait_semaphore.take());
                if let Some(signal) = self.signal_semaphore.take() {
                    swapchain.defer_semaphore(signal);
                }
            }
        }
        self.swapchain = None;
        self.ready = false;
        self.state = SwapchainImageState::Presented;
    }

    /// Return both semaphores to the pool once presentation finished
    ///
    /// Returns false if the image is not presented yet or is detached.
    pub fn release_semaphores(&mut self) -> bool {
        if self.state != SwapchainImageState::Presented {
            return false;
        }
        let Some(swapchain) = self.swapchain.as_ref() else {
            return false;
        };
        if let Some(sem) = self.wait_semaphore.take() {
            swapchain.release_semaphore(sem);
        }
        if let Some(sem) = self.signal_semaphore.take() {
            swapchain.release_semaphore(sem);
        }
        true
    }
}

impl Drop for SwapchainImage {
    fn drop(&mut self) {
        if self.state == SwapchainImageState::Presented {
            self.release_semaphores();
        } else {
            self.invalidate_image();
        }
    }
}

/// Window and surface collaborators
///
/// The host windowing layer implements [`PresentationWindow`]; the platform
/// graphics layer implements [`PresentationSurface`].

use crate::error::Result;
use crate::frame::{FrameId, PresentationFrame};
use crate::info::{
    FrameConstraints, ImageInfo, ImageViewInfo, PresentMode, SurfaceInfo, SwapchainConfig,
};
use crate::looper::{EngineEvent, LoopProxy};
use crate::swapchain::{Swapchain, SwapchainBackend};

/// Asynchronous request for per-frame platform data
///
/// The window calls [`FrameDataRequest::complete`] once the data is ready,
/// from any thread.
#[derive(Debug, Clone)]
pub struct FrameDataRequest {
    frame: FrameId,
    order: u64,
    proxy: LoopProxy,
}

impl FrameDataRequest {
    pub(crate) fn new(frame: FrameId, order: u64, proxy: LoopProxy) -> Self {
        Self { frame, order, proxy }
    }

    pub fn frame(&self) -> FrameId {
        self.frame
    }

    pub fn order(&self) -> u64 {
        self.order
    }

    pub fn complete(self) -> bool {
        self.proxy.post(EngineEvent::FrameDataAcquired { frame: self.frame })
    }
}

/// Host window queried for surface capabilities and per-frame data
pub trait PresentationWindow {
    /// Describe the swapchain images for a configuration
    fn get_swapchain_image_info(&self, cfg: &SwapchainConfig) -> ImageInfo;

    /// Describe the view the renderer uses on a swapchain image
    fn get_swapchain_image_view_info(&self, image: &ImageInfo) -> ImageViewInfo {
        ImageViewInfo::for_image(image)
    }

    /// Adjust raw surface capabilities (e.g. restrict formats)
    fn get_surface_options(&self, info: SurfaceInfo) -> SurfaceInfo {
        info
    }

    /// Pick a configuration; `fast` requests the low-latency present mode
    fn select_config(&mut self, info: &SurfaceInfo, fast: bool) -> SwapchainConfig;

    /// Prepare platform data for a frame, then complete the request
    fn acquire_frame_data(&mut self, request: FrameDataRequest);

    /// A frame reached the display
    fn handle_frame_presented(&mut self, frame: &PresentationFrame);

    /// Current output constraints (extent, transform, density)
    fn export_frame_constraints(&self) -> FrameConstraints;
}

/// Platform surface that swapchains are created for
pub trait PresentationSurface {
    /// Raw surface capabilities
    fn surface_options(&self) -> SurfaceInfo;

    /// Create a platform swapchain
    ///
    /// # Arguments
    ///
    /// * `info` - Surface capabilities (after window adjustment)
    /// * `cfg` - Selected configuration
    /// * `image` - Swapchain image description
    /// * `present_mode` - Mode to create the swapchain with
    /// * `old` - Swapchain being replaced, if it is still usable
    fn create_swapchain(
        &mut self,
        info: &SurfaceInfo,
        cfg: &SwapchainConfig,
        image: &ImageInfo,
        present_mode: PresentMode,
        old: Option<&Swapchain>,
    ) -> Result<Box<dyn SwapchainBackend>>;
}

/// Mock swapchain backend for unit tests (no GPU required)

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use crate::device::{DeviceQueue, Fence, Semaphore};
use crate::info::{ImageInfo, ImageViewInfo, PresentMode, SurfaceInfo, SwapchainConfig};
use crate::status::Status;
use super::backend::SwapchainBackend;
use super::swapchain::Swapchain;

/// Observable state shared between a test and its mock backend
#[derive(Debug, Default)]
pub struct MockBackendState {
    pub image_count: u32,
    pub next_image: u32,
    /// Scripted acquire results, `Ok` once exhausted
    pub acquire_results: VecDeque<Status>,
    /// Scripted present results, `Ok` once exhausted
    pub present_results: VecDeque<Status>,
    /// Signal the acquire fence immediately
    pub signal_fences: bool,
    pub acquire_calls: u32,
    pub presented: Vec<u32>,
    pub invalidated: Vec<u32>,
    pub semaphores_created: u64,
}

pub struct MockSwapchainBackend {
    pub state: Arc<Mutex<MockBackendState>>,
}

impl MockSwapchainBackend {
    pub fn new(image_count: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockBackendState {
                image_count,
                signal_fences: true,
                ..Default::default()
            })),
        }
    }
}

impl SwapchainBackend for MockSwapchainBackend {
    fn image_count(&self) -> u32 {
        self.state.lock().unwrap().image_count
    }

    fn acquire_next_image(
        &self,
        _lockfree: bool,
        fence: &Fence,
        _semaphore: &Semaphore,
    ) -> (Option<u32>, Status) {
        let mut state = self.state.lock().unwrap();
        state.acquire_calls += 1;
        let status = state.acquire_results.pop_front().unwrap_or(Status::Ok);
        if !status.is_success() {
            return (None, status);
        }
        let index = state.next_image;
        state.next_image = (state.next_image + 1) % state.image_count.max(1);
        if state.signal_fences {
            fence.signal(true);
        }
        (Some(index), status)
    }

    fn present(
        &self,
        _queue: &DeviceQueue,
        image_index: u32,
        _wait: &Semaphore,
        _present_window: u64,
    ) -> Status {
        let mut state = self.state.lock().unwrap();
        state.presented.push(image_index);
        state.present_results.pop_front().unwrap_or(Status::Ok)
    }

    fn invalidate_image(&self, image_index: u32) {
        self.state.lock().unwrap().invalidated.push(image_index);
    }

    fn create_semaphore(&self) -> Semaphore {
        let mut state = self.state.lock().unwrap();
        state.semaphores_created += 1;
        Semaphore::new(state.semaphores_created)
    }
}

/// Surface supporting the default swapchain configuration
pub fn mock_surface_info() -> SurfaceInfo {
    SurfaceInfo {
        current_extent: crate::info::Extent2::new(800, 600),
        formats: vec![(
            crate::info::ImageFormat::B8G8R8A8_UNORM,
            crate::info::ColorSpace::SrgbNonlinear,
        )],
        present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox, PresentMode::Immediate],
        ..Default::default()
    }
}

/// Swapchain over a mock backend, with access to the backend state
pub fn create_mock_swapchain(config: SwapchainConfig) -> (Arc<Swapchain>, Arc<Mutex<MockBackendState>>) {
    let mode = config.present_mode;
    create_mock_swapchain_in_mode(config, mode)
}

/// Same as [`create_mock_swapchain`], created with `mode` instead of the
/// preferred present mode
pub fn create_mock_swapchain_in_mode(
    config: SwapchainConfig,
    mode: PresentMode,
) -> (Arc<Swapchain>, Arc<Mutex<MockBackendState>>) {
    let backend = MockSwapchainBackend::new(config.image_count);
    let state = Arc::clone(&backend.state);
    let image_info = ImageInfo {
        format: config.image_format,
        extent: config.extent,
        array_layers: 1,
        transfer_dst: config.transfer,
        color_attachment: true,
    };
    let swapchain = Swapchain::new(
        Box::new(backend),
        mock_surface_info(),
        config,
        image_info,
        ImageViewInfo::for_image(&image_info),
        mode,
    );
    (Arc::new(swapchain), state)
}

/// Swapchain module - platform-agnostic swapchain and presentable images

pub mod backend;
#[allow(clippy::module_inception)]
pub mod swapchain;
pub mod swapchain_image;

pub use backend::*;
pub use swapchain::*;
pub use swapchain_image::*;

// Mock backend for tests (no GPU required)
#[cfg(test)]
pub(crate) mod mock_backend;

#[cfg(test)]
#[path = "swapchain_tests.rs"]
mod tests;

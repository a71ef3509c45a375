/// SwapchainBackend trait - the platform half of a swapchain

use crate::device::{DeviceQueue, Fence, Semaphore};
use crate::status::Status;

/// Platform swapchain object created by a presentation surface
///
/// Wrapped by [`super::Swapchain`], which adds counters, deprecation and the
/// semaphore pool. Implementations translate platform results into [`Status`].
pub trait SwapchainBackend: Send + Sync {
    /// Number of images in the swapchain
    fn image_count(&self) -> u32;

    /// Acquire the next presentable image
    ///
    /// On success returns the image index; `fence` must be signaled once the
    /// image is usable and `semaphore` is signaled on the GPU.
    ///
    /// # Arguments
    ///
    /// * `lockfree` - Do not block waiting for an image (timeout 0)
    /// * `fence` - Fence to signal when the image is ready
    /// * `semaphore` - Semaphore signaled by the acquisition
    fn acquire_next_image(
        &self,
        lockfree: bool,
        fence: &Fence,
        semaphore: &Semaphore,
    ) -> (Option<u32>, Status);

    /// Queue an image for presentation
    ///
    /// # Arguments
    ///
    /// * `queue` - Present-capable device queue
    /// * `image_index` - Index returned by `acquire_next_image`
    /// * `wait` - Semaphore signaled when rendering into the image finished
    /// * `present_window` - Earliest desired present time (0 = as soon as possible)
    fn present(
        &self,
        queue: &DeviceQueue,
        image_index: u32,
        wait: &Semaphore,
        present_window: u64,
    ) -> Status;

    /// Return an acquired image that will never be presented
    fn invalidate_image(&self, image_index: u32);

    /// Create a new semaphore for the pool
    fn create_semaphore(&self) -> Semaphore;
}

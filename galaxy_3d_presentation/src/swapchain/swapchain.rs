/// Swapchain - shared, platform-agnostic wrapper around a [`SwapchainBackend`]
///
/// A swapchain is shared through `Arc` by the engine, every live frame and
/// every swapchain image. Counters and state flags are atomics; only the
/// semaphore pool sits behind a mutex, since image release may happen on
/// completion threads.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use crate::device::{DeviceQueue, Fence, Semaphore};
use crate::info::{ImageInfo, ImageViewInfo, PresentMode, SurfaceInfo, SwapchainConfig};
use crate::status::Status;
use crate::{engine_debug, engine_error, engine_warn};
use super::backend::SwapchainBackend;
use super::swapchain_image::SwapchainImage;

static NEXT_SWAPCHAIN_ID: AtomicU64 = AtomicU64::new(1);

/// Presents a fast-mode swapchain makes before asking to go back to the
/// preferred present mode
pub const MAX_SUBOPTIMAL_FRAMES: u64 = 24;

// ===== ACQUIRED IMAGE =====

/// Image handed out by [`Swapchain::acquire`]
///
/// Counts as acquired until it is presented or invalidated.
#[derive(Debug)]
pub struct AcquiredImage {
    pub image_index: u32,
    /// Monotonic acquisition number within the swapchain
    pub serial: u64,
    /// Semaphore signaled by the acquisition
    pub semaphore: Option<Semaphore>,
    pub swapchain: Arc<Swapchain>,
}

impl AcquiredImage {
    /// Give the image back without presenting it
    pub fn invalidate(self) {
        self.swapchain.invalidate_image(self.image_index, self.semaphore);
    }
}

// ===== SEMAPHORE POOL =====

#[derive(Default)]
struct SemaphorePool {
    free: Vec<Semaphore>,
    /// Semaphores of invalidated images, possibly still in use by the GPU
    deferred: Vec<Semaphore>,
}

// ===== SWAPCHAIN =====

pub struct Swapchain {
    id: u64,
    backend: Box<dyn SwapchainBackend>,
    present_mode: PresentMode,
    fast_rebuild: AtomicBool,
    optimal_rebuild: AtomicBool,
    image_info: ImageInfo,
    view_info: ImageViewInfo,
    surface_info: SurfaceInfo,
    config: SwapchainConfig,

    acquired_images: AtomicU32,
    presented_frames: AtomicU64,
    acquire_serial: AtomicU64,
    deprecated: AtomicBool,
    invalid: AtomicBool,
    fullscreen_exclusive: AtomicBool,

    semaphores: Mutex<SemaphorePool>,
}

impl std::fmt::Debug for Swapchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Swapchain")
            .field("id", &self.id)
            .field("present_mode", &self.present_mode)
            .field("acquired_images", &self.acquired_images_count())
            .field("presented_frames", &self.presented_frames_count())
            .field("deprecated", &self.is_deprecated())
            .field("invalid", &!self.is_valid())
            .finish()
    }
}

impl Swapchain {
    /// Wrap a freshly created backend
    ///
    /// # Arguments
    ///
    /// * `backend` - Platform swapchain created by the surface
    /// * `surface_info` - Surface capabilities the swapchain was created for
    /// * `config` - Selected configuration
    /// * `image_info` - Description of the swapchain images
    /// * `view_info` - Default view onto the images
    /// * `present_mode` - Mode actually used (preferred or fast)
    pub fn new(
        backend: Box<dyn SwapchainBackend>,
        surface_info: SurfaceInfo,
        config: SwapchainConfig,
        image_info: ImageInfo,
        view_info: ImageViewInfo,
        present_mode: PresentMode,
    ) -> Self {
        let fullscreen_exclusive = surface_info.fullscreen_exclusive;
        Self {
            id: NEXT_SWAPCHAIN_ID.fetch_add(1, Ordering::Relaxed),
            backend,
            present_mode,
            fast_rebuild: AtomicBool::new(false),
            optimal_rebuild: AtomicBool::new(false),
            image_info,
            view_info,
            surface_info,
            config,
            acquired_images: AtomicU32::new(0),
            presented_frames: AtomicU64::new(0),
            acquire_serial: AtomicU64::new(0),
            deprecated: AtomicBool::new(false),
            invalid: AtomicBool::new(false),
            fullscreen_exclusive: AtomicBool::new(fullscreen_exclusive),
            semaphores: Mutex::new(SemaphorePool::default()),
        }
    }

    /// Process-unique swapchain identifier
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn present_mode(&self) -> PresentMode {
        self.present_mode
    }

    /// Present mode to use for the next rebuild
    pub fn rebuild_mode(&self) -> PresentMode {
        if self.fast_rebuild.load(Ordering::Acquire) {
            self.config.present_mode_fast
        } else if self.optimal_rebuild.load(Ordering::Acquire) {
            self.config.present_mode
        } else {
            self.present_mode
        }
    }

    pub fn config(&self) -> &SwapchainConfig {
        &self.config
    }

    pub fn image_info(&self) -> &ImageInfo {
        &self.image_info
    }

    pub fn view_info(&self) -> &ImageViewInfo {
        &self.view_info
    }

    pub fn surface_info(&self) -> &SurfaceInfo {
        &self.surface_info
    }

    pub fn image_count(&self) -> u32 {
        self.backend.image_count()
    }

    /// Images acquired and not yet presented or invalidated
    pub fn acquired_images_count(&self) -> u32 {
        self.acquired_images.load(Ordering::Acquire)
    }

    pub fn presented_frames_count(&self) -> u64 {
        self.presented_frames.load(Ordering::Acquire)
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecated.load(Ordering::Acquire)
    }

    pub fn is_valid(&self) -> bool {
        !self.invalid.load(Ordering::Acquire)
    }

    /// Running in the configuration's preferred present mode
    pub fn is_optimal(&self) -> bool {
        self.present_mode == self.config.present_mode
    }

    pub fn is_fullscreen_exclusive(&self) -> bool {
        self.fullscreen_exclusive.load(Ordering::Acquire)
    }

    /// Mark the swapchain for replacement
    ///
    /// Returns true only for the first call. With `fast`, the rebuild uses
    /// the configuration's fast present mode when one is set.
    pub fn deprecate(&self, fast: bool) -> bool {
        let was_deprecated = self.deprecated.swap(true, Ordering::AcqRel);
        if fast && self.config.present_mode_fast != PresentMode::Unsupported {
            self.fast_rebuild.store(true, Ordering::Release);
        }
        !was_deprecated
    }

    /// Retire the swapchain: no further presents, semaphores are dropped
    pub fn invalidate(&self) {
        self.invalid.store(true, Ordering::Release);
        self.deprecated.store(true, Ordering::Release);
        if let Ok(mut pool) = self.semaphores.lock() {
            pool.free.clear();
            pool.deferred.clear();
        }
    }

    /// Acquire the next image
    ///
    /// Callers must keep at most one acquire outstanding. `Suboptimal` still
    /// yields an image but deprecates the swapchain.
    pub fn acquire(self: &Arc<Self>, lockfree: bool, fence: &Fence) -> (Option<AcquiredImage>, Status) {
        if self.is_deprecated() {
            return (None, Status::ErrorCancelled);
        }

        let semaphore = self.acquire_semaphore();
        let (index, status) = self.backend.acquire_next_image(lockfree, fence, &semaphore);

        match (index, status) {
            (Some(image_index), Status::Ok) | (Some(image_index), Status::Suboptimal) => {
                if status == Status::Suboptimal {
                    self.deprecated.store(true, Ordering::Release);
                }
                self.acquired_images.fetch_add(1, Ordering::AcqRel);
                let serial = self.acquire_serial.fetch_add(1, Ordering::AcqRel);
                let image = AcquiredImage {
                    image_index,
                    serial,
                    semaphore: Some(semaphore),
                    swapchain: Arc::clone(self),
                };
                (Some(image), status)
            }
            (_, Status::ErrorCancelled) => {
                self.deprecated.store(true, Ordering::Release);
                self.release_semaphore(semaphore);
                (None, status)
            }
            (_, Status::Timeout) | (_, Status::NotReady) => {
                self.release_semaphore(semaphore);
                (None, status)
            }
            _ => {
                self.release_semaphore(semaphore);
                engine_error!("galaxy3d::Swapchain", "Fail to acquire image: {:?}", status);
                (None, status)
            }
        }
    }

    /// Present a rendered image
    ///
    /// The image stops counting as acquired whatever the result. A swapchain
    /// running in the fast present mode reports `Suboptimal` at its
    /// [`MAX_SUBOPTIMAL_FRAMES`]th present, so it is rebuilt in the preferred
    /// mode.
    pub fn present(&self, queue: &DeviceQueue, image: &mut SwapchainImage, present_window: u64) -> Status {
        if !self.is_valid() {
            return Status::ErrorCancelled;
        }

        let (Some(image_index), Some(wait)) = (image.image_index(), image.signal_semaphore().cloned()) else {
            engine_warn!("galaxy3d::Swapchain", "Present requested for an image without acquisition");
            return Status::ErrorCancelled;
        };

        let status = self.backend.present(queue, image_index, &wait, present_window);
        self.release_acquired();

        let mut status = status;
        match status {
            Status::Ok => {
                let presented = self.presented_frames.fetch_add(1, Ordering::AcqRel) + 1;
                if presented == MAX_SUBOPTIMAL_FRAMES && self.is_fast_fallback() {
                    engine_debug!(
                        "galaxy3d::Swapchain",
                        "Fast present mode used for {} frames, back to {:?}",
                        presented,
                        self.config.present_mode
                    );
                    self.fast_rebuild.store(false, Ordering::Release);
                    self.optimal_rebuild.store(true, Ordering::Release);
                    self.deprecated.store(true, Ordering::Release);
                    status = Status::Suboptimal;
                }
            }
            Status::Suboptimal => {
                self.presented_frames.fetch_add(1, Ordering::AcqRel);
                self.deprecated.store(true, Ordering::Release);
            }
            Status::FullscreenLost => {
                self.fullscreen_exclusive.store(false, Ordering::Release);
                self.deprecated.store(true, Ordering::Release);
            }
            Status::ErrorCancelled => {
                self.deprecated.store(true, Ordering::Release);
            }
            _ => {}
        }

        image.set_presented();
        status
    }

    /// Return an acquired image without presenting it
    ///
    /// The image's wait semaphore may still be pending on the GPU, so it is
    /// parked until [`Self::recycle_deferred_semaphores`].
    pub fn invalidate_image(&self, image_index: u32, semaphore: Option<Semaphore>) {
        self.backend.invalidate_image(image_index);
        self.release_acquired();

        if let Some(sem) = semaphore {
            self.defer_semaphore(sem);
        }
    }

    /// Park a semaphore that may still be in use by the GPU
    pub fn defer_semaphore(&self, semaphore: Semaphore) {
        if !self.is_valid() {
            return;
        }
        if let Ok(mut pool) = self.semaphores.lock() {
            pool.deferred.push(semaphore);
        }
    }

    /// Take a semaphore from the pool, creating one if it is empty
    pub fn acquire_semaphore(&self) -> Semaphore {
        let pooled = self.semaphores.lock().ok().and_then(|mut pool| pool.free.pop());
        match pooled {
            Some(sem) => sem,
            None => self.backend.create_semaphore(),
        }
    }

    /// Return a semaphore to the pool
    ///
    /// Returns false if the swapchain is invalid and the semaphore was dropped.
    pub fn release_semaphore(&self, semaphore: Semaphore) -> bool {
        if !self.is_valid() {
            return false;
        }
        match self.semaphores.lock() {
            Ok(mut pool) => {
                pool.free.push(semaphore);
                true
            }
            Err(_) => false,
        }
    }

    /// Make parked semaphores reusable once the device is idle
    pub fn recycle_deferred_semaphores(&self) -> usize {
        let Ok(mut pool) = self.semaphores.lock() else {
            return 0;
        };
        let count = pool.deferred.len();
        let deferred = std::mem::take(&mut pool.deferred);
        pool.free.extend(deferred);
        if count > 0 {
            engine_debug!("galaxy3d::Swapchain", "Recycled {} deferred semaphores", count);
        }
        count
    }

    pub fn free_semaphore_count(&self) -> usize {
        self.semaphores.lock().map(|pool| pool.free.len()).unwrap_or(0)
    }

    pub fn deferred_semaphore_count(&self) -> usize {
        self.semaphores.lock().map(|pool| pool.deferred.len()).unwrap_or(0)
    }

    /// Running in the fast mode while the preferred one differs
    fn is_fast_fallback(&self) -> bool {
        !self.is_optimal() && self.present_mode == self.config.present_mode_fast
    }

    fn release_acquired(&self) {
        let _ = self.acquired_images.fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
            count.checked_sub(1)
        });
    }
}

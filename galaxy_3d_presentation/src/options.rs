/// Presentation engine configuration
///
/// Each boolean toggles one pacing or ordering rule of the engine.
/// Timing values are in microseconds of the engine clock.

use std::time::Duration;
use bitflags::bitflags;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct PresentationOptions {
    /// Start the next frame only on request (`set_ready_for_next_frame`).
    /// The presentation interval is then measured from real presents.
    pub render_on_demand: bool,

    /// Follow the platform display link: rendered frames wait for the next
    /// vsync tick before they are presented.
    pub follow_display_link: bool,

    /// Do not start a new frame until a display-link tick arrived since the
    /// previous one.
    pub follow_display_link_barrier: bool,

    /// Hold rendered frames until the next present window instead of
    /// presenting them as soon as they are ready.
    pub use_present_window: bool,

    /// Present as soon as the image is rendered, before GPU completion is
    /// reported for the whole frame.
    pub early_present: bool,

    /// Release the frame slot when its image is rendered, so the next frame
    /// can start while the previous one waits for presentation.
    pub pre_start_frame: bool,

    /// Render into offscreen images; presentation completes without a
    /// swapchain present call.
    pub render_image_offscreen: bool,

    /// `update_constraints` blocks the caller until the swapchain is rebuilt.
    pub sync_constraints_update: bool,

    /// Target interval between presents (0 = as fast as possible)
    pub target_frame_interval: u64,

    /// Approximate interval between loop updates, used as pacing tolerance
    pub engine_update_interval: u64,

    /// Period of the retry timer armed when image acquisition times out
    pub acquire_retry_interval: u64,

    /// Upper bound for blocking waits that re-enter the loop
    pub wait_timeout: Duration,
}

impl Default for PresentationOptions {
    fn default() -> Self {
        Self {
            render_on_demand: true,
            follow_display_link: false,
            follow_display_link_barrier: false,
            use_present_window: false,
            early_present: false,
            pre_start_frame: false,
            render_image_offscreen: false,
            sync_constraints_update: false,
            target_frame_interval: 0,
            engine_update_interval: 250,
            acquire_retry_interval: 1_000,
            wait_timeout: Duration::from_secs(1),
        }
    }
}

bitflags! {
    /// Reasons to deprecate the current swapchain
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct UpdateConstraintsFlags: u32 {
        /// Rebuild the swapchain (resize, format or color space change)
        const DEPRECATE_SWAPCHAIN = 1 << 0;
        /// Rebuild with the configuration's fast present mode
        const SWITCH_TO_FAST_MODE = 1 << 1;
        /// Do not rebuild: finalize the engine once outstanding work drains
        const END_OF_LIFE = 1 << 2;
        /// Rebuild on the surface passed to `set_next_surface` (fullscreen
        /// switch); the old swapchain is not handed to the new one
        const SWITCH_TO_NEXT = 1 << 3;
        /// Set after END_OF_LIFE was processed, no further rebuilds
        const FINALIZED = 1 << 4;
    }
}

/// Frame state flags
///
/// Flags only accumulate over a frame's life. Once `INVALIDATED` is set the
/// set is frozen; [`FrameFlagSet::reset`] is the only way to clear it.

use bitflags::bitflags;
use crate::engine_warn;

bitflags! {
    /// Progress of a frame through acquisition, rendering and presentation
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FrameFlags: u32 {
        /// Render into an offscreen image instead of a swapchain image
        const OFFSCREEN_TARGET = 1 << 0;
        /// Render but never present (screenshots, captures)
        const DO_NOT_PRESENT = 1 << 1;
        /// A swapchain image was requested for the frame
        const SWAPCHAIN_IMAGE_ACQUIRED = 1 << 2;
        /// An acquired image is bound to the frame
        const IMAGE_ACQUIRED = 1 << 3;
        /// Output attachment wired into the frame request
        const INPUT_ACQUIRED = 1 << 4;
        /// Request handed to the frame queue
        const FRAME_SUBMITTED = 1 << 5;
        /// Commands submitted to the GPU
        const QUEUE_SUBMITTED = 1 << 6;
        /// Output image rendered
        const IMAGE_RENDERED = 1 << 7;
        /// Image presented (or completed offscreen)
        const IMAGE_PRESENTED = 1 << 8;
        /// Frame dropped
        const INVALIDATED = 1 << 9;
        /// Frame scheduled by pacing, its present window may be corrected
        const CORRECTABLE_FRAME = 1 << 10;

        /// Flags accepted at frame creation
        const INIT_FLAGS = Self::OFFSCREEN_TARGET.bits() | Self::DO_NOT_PRESENT.bits();
    }
}

/// Monotonic flag accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameFlagSet {
    bits: FrameFlags,
}

impl FrameFlagSet {
    pub fn new(initial: FrameFlags) -> Self {
        Self { bits: initial }
    }

    pub fn bits(&self) -> FrameFlags {
        self.bits
    }

    pub fn contains(&self, flags: FrameFlags) -> bool {
        self.bits.contains(flags)
    }

    pub fn is_invalidated(&self) -> bool {
        self.bits.contains(FrameFlags::INVALIDATED)
    }

    /// Add flags
    ///
    /// Refused once the frame is invalidated (except re-inserting
    /// `INVALIDATED` itself, which is a no-op). Returns whether the set
    /// changed.
    pub fn insert(&mut self, flags: FrameFlags) -> bool {
        if self.is_invalidated() {
            let extra = flags - FrameFlags::INVALIDATED;
            debug_assert!(extra.is_empty(), "flags {:?} set on invalidated frame", extra);
            if !extra.is_empty() {
                engine_warn!("galaxy3d::PresentationFrame", "Flags {:?} set on invalidated frame", extra);
            }
            return false;
        }
        let before = self.bits;
        self.bits |= flags;
        self.bits != before
    }

    /// Clear every flag
    pub fn reset(&mut self) {
        self.bits = FrameFlags::empty();
    }
}

#[cfg(test)]
#[path = "flags_tests.rs"]
mod tests;

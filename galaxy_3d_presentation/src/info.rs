/// Surface, swapchain and image description types
///
/// These are plain data shared between the engine and its collaborators:
/// the window reports what the surface can do ([`SurfaceInfo`]), picks a
/// [`SwapchainConfig`] from it, and describes the images it wants
/// ([`ImageInfo`]).

use std::fmt;
use bitflags::bitflags;

// ===== EXTENT =====

/// Two-dimensional size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2 {
    pub width: u32,
    pub height: u32,
}

impl Extent2 {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Zero-sized extent (minimized window)
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Extent2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ===== ENUMS =====

/// Swapchain presentation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresentMode {
    /// No mode selected / not available
    #[default]
    Unsupported,
    Immediate,
    FifoRelaxed,
    Fifo,
    Mailbox,
}

/// Swapchain image pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(non_camel_case_types)]
pub enum ImageFormat {
    #[default]
    Undefined,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    A2B10G10R10_UNORM,
    R16G16B16A16_SFLOAT,
}

/// Swapchain color space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSpace {
    #[default]
    SrgbNonlinear,
    ExtendedSrgbLinear,
    DisplayP3Nonlinear,
    Hdr10St2084,
}

bitflags! {
    /// Compositor alpha modes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CompositeAlphaFlags: u32 {
        const OPAQUE = 1 << 0;
        const PREMULTIPLIED = 1 << 1;
        const POSTMULTIPLIED = 1 << 2;
        const INHERIT = 1 << 3;
    }
}

bitflags! {
    /// Surface pre-transform
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SurfaceTransformFlags: u32 {
        const IDENTITY = 1 << 0;
        const ROTATE_90 = 1 << 1;
        const ROTATE_180 = 1 << 2;
        const ROTATE_270 = 1 << 3;
        const MIRROR = 1 << 4;
        const MIRROR_ROTATE_90 = 1 << 5;
        const MIRROR_ROTATE_180 = 1 << 6;
        const MIRROR_ROTATE_270 = 1 << 7;
        const INHERIT = 1 << 8;
    }
}

// ===== SWAPCHAIN CONFIG =====

/// Swapchain configuration selected by the window from a [`SurfaceInfo`]
#[derive(Debug, Clone, PartialEq)]
pub struct SwapchainConfig {
    /// Preferred present mode
    pub present_mode: PresentMode,
    /// Fallback mode used when a fast rebuild is requested (`Unsupported` = none)
    pub present_mode_fast: PresentMode,
    pub image_format: ImageFormat,
    pub color_space: ColorSpace,
    pub alpha: CompositeAlphaFlags,
    pub transform: SurfaceTransformFlags,
    pub image_count: u32,
    pub extent: Extent2,
    pub clipped: bool,
    /// Images may be used as transfer destination
    pub transfer: bool,
}

impl Default for SwapchainConfig {
    fn default() -> Self {
        Self {
            present_mode: PresentMode::Mailbox,
            present_mode_fast: PresentMode::Unsupported,
            image_format: ImageFormat::B8G8R8A8_UNORM,
            color_space: ColorSpace::SrgbNonlinear,
            alpha: CompositeAlphaFlags::OPAQUE,
            transform: SurfaceTransformFlags::IDENTITY,
            image_count: 3,
            extent: Extent2::default(),
            clipped: false,
            transfer: true,
        }
    }
}

impl SwapchainConfig {
    /// Human-readable summary for logs
    pub fn description(&self) -> String {
        format!(
            "SwapchainConfig: present: {:?} (fast: {:?}); format: {:?}; color space: {:?}; images: {}; extent: {}; transfer: {}",
            self.present_mode,
            self.present_mode_fast,
            self.image_format,
            self.color_space,
            self.image_count,
            self.extent,
            self.transfer,
        )
    }
}

// ===== SURFACE INFO =====

/// Capabilities reported by a presentation surface
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceInfo {
    pub min_image_count: u32,
    /// 0 = no upper limit
    pub max_image_count: u32,
    pub current_extent: Extent2,
    pub min_image_extent: Extent2,
    pub max_image_extent: Extent2,
    pub supported_composite_alpha: CompositeAlphaFlags,
    pub supported_transforms: SurfaceTransformFlags,
    pub current_transform: SurfaceTransformFlags,
    pub formats: Vec<(ImageFormat, ColorSpace)>,
    pub present_modes: Vec<PresentMode>,
    pub surface_density: f32,
    /// Surface supports exclusive fullscreen presentation
    pub fullscreen_exclusive: bool,
}

impl Default for SurfaceInfo {
    fn default() -> Self {
        Self {
            min_image_count: 2,
            max_image_count: 0,
            current_extent: Extent2::default(),
            min_image_extent: Extent2::new(1, 1),
            max_image_extent: Extent2::new(u32::MAX, u32::MAX),
            supported_composite_alpha: CompositeAlphaFlags::OPAQUE,
            supported_transforms: SurfaceTransformFlags::IDENTITY,
            current_transform: SurfaceTransformFlags::IDENTITY,
            formats: Vec::new(),
            present_modes: Vec::new(),
            surface_density: 1.0,
            fullscreen_exclusive: false,
        }
    }
}

impl SurfaceInfo {
    /// Check that the surface can host a swapchain with this configuration
    ///
    /// Logs the first unsupported criterion.
    pub fn is_supported(&self, cfg: &SwapchainConfig) -> bool {
        match self.unsupported_reason(cfg) {
            Some(reason) => {
                crate::engine_error!("galaxy3d::SurfaceInfo", "{} is not supported", reason);
                false
            }
            None => true,
        }
    }

    /// First criterion of `cfg` the surface does not support, if any
    pub fn unsupported_reason(&self, cfg: &SwapchainConfig) -> Option<&'static str> {
        if !self.present_modes.contains(&cfg.present_mode) {
            return Some("presentMode");
        }

        if cfg.present_mode_fast != PresentMode::Unsupported
            && !self.present_modes.contains(&cfg.present_mode_fast)
        {
            return Some("presentModeFast");
        }

        if !self.formats.contains(&(cfg.image_format, cfg.color_space)) {
            return Some("imageFormat or colorSpace");
        }

        if !self.supported_composite_alpha.intersects(cfg.alpha) {
            return Some("alpha");
        }

        if !self.supported_transforms.intersects(cfg.transform) {
            return Some("transform");
        }

        if cfg.image_count < self.min_image_count
            || (self.max_image_count != 0 && cfg.image_count > self.max_image_count)
        {
            return Some("imageCount");
        }

        if cfg.extent.width < self.min_image_extent.width
            || cfg.extent.width > self.max_image_extent.width
            || cfg.extent.height < self.min_image_extent.height
            || cfg.extent.height > self.max_image_extent.height
        {
            return Some("extent");
        }

        None
    }

    /// Human-readable summary for logs
    pub fn description(&self) -> String {
        format!(
            "SurfaceInfo: images: {}-{}; extent: {} ({}..{}); formats: {}; present modes: {:?}; density: {}",
            self.min_image_count,
            self.max_image_count,
            self.current_extent,
            self.min_image_extent,
            self.max_image_extent,
            self.formats.len(),
            self.present_modes,
            self.surface_density,
        )
    }
}

// ===== IMAGE INFO =====

/// Description of a swapchain image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub extent: Extent2,
    pub array_layers: u32,
    /// Usable as transfer destination (blit/copy presentation)
    pub transfer_dst: bool,
    /// Usable as color attachment
    pub color_attachment: bool,
}

/// Image view type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageViewType {
    #[default]
    View2D,
    View2DArray,
}

/// Description of a view onto a swapchain image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageViewInfo {
    pub view_type: ImageViewType,
    pub format: ImageFormat,
    pub base_layer: u32,
    pub layer_count: u32,
}

impl ImageViewInfo {
    /// Default full view onto an image
    pub fn for_image(image: &ImageInfo) -> Self {
        Self {
            view_type: if image.array_layers > 1 {
                ImageViewType::View2DArray
            } else {
                ImageViewType::View2D
            },
            format: image.format,
            base_layer: 0,
            layer_count: image.array_layers.max(1),
        }
    }
}

// ===== FRAME CONSTRAINTS =====

/// Per-frame output constraints exported by the window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameConstraints {
    pub extent: Extent2,
    pub transform: SurfaceTransformFlags,
    pub density: f32,
}

impl Default for FrameConstraints {
    fn default() -> Self {
        Self {
            extent: Extent2::default(),
            transform: SurfaceTransformFlags::IDENTITY,
            density: 1.0,
        }
    }
}

#[cfg(test)]
#[path = "info_tests.rs"]
mod tests;

//! Frame module
//!
//! One [`PresentationFrame`] per produced image, tracked by the engine in a
//! [`FrameRegistry`] keyed by [`FrameId`].

mod flags;
mod presentation_frame;
mod registry;

pub use flags::{FrameFlags, FrameFlagSet};
pub use presentation_frame::{FrameCallback, FrameTarget, PresentationFrame};
pub use registry::{FrameId, FrameRegistry, FrameStatus};

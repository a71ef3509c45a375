//! Presentation engine: frame scheduling, image acquisition, pacing and
//! swapchain rebuilds

pub mod engine_proxy;
pub mod presentation_engine;

pub use engine_proxy::*;
pub use presentation_engine::*;

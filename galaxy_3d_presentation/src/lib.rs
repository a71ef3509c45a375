/*!
# Galaxy 3D Presentation

Swapchain presentation core for the Galaxy 3D engine.

This crate owns everything between "a frame should be drawn" and "the image
reached the display": frame scheduling, swapchain image acquisition, present
pacing and swapchain rebuilds. Windowing, rendering and the graphics API are
collaborators reached through traits, so platform backends plug in without
the core knowing about them.

## Architecture

- **PresentationEngine**: single-thread state machine driving frames
- **PresentationFrame**: one produced image, from scheduling to presentation
- **Swapchain**: platform-agnostic wrapper around a `SwapchainBackend`
- **PresentationWindow / PresentationSurface**: host window and platform surface
- **FrameQueue**: renderer that turns frame requests into images
- **Device**: present queues and device-wide synchronization

Collaborators report asynchronous completion by posting events to the
engine's loop (`LoopProxy`, `EngineProxy`), never by touching engine state.
*/

// Internal modules
pub mod error;
pub mod log;
pub mod status;
pub mod info;
pub mod options;
pub mod clock;
pub mod timing;
pub mod looper;
pub mod device;
pub mod swapchain;
pub mod frame;
pub mod frame_queue;
pub mod window;
pub mod engine;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine
    pub use crate::engine::{ConstraintsCallback, EngineProxy, PresentationEngine};
    pub use crate::options::{PresentationOptions, UpdateConstraintsFlags};
    pub use crate::status::Status;

    // Collaborator traits
    pub use crate::window::{FrameDataRequest, PresentationSurface, PresentationWindow};
    pub use crate::frame_queue::{
        FrameHandle, FrameNotifier, FrameQueue, FrameReport, FrameRequest, RenderTarget,
    };
    pub use crate::device::{Device, DeviceQueue, Fence, FenceId, QueueFlags, QueueRequest, Semaphore};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Frame sub-module
    pub mod frame {
        pub use crate::frame::*;
    }

    // Swapchain sub-module
    pub mod swapchain {
        pub use crate::swapchain::*;
        pub use crate::info::*;
    }

    // Time sub-module
    pub mod time {
        pub use crate::clock::*;
        pub use crate::timing::*;
    }
}

//! Error types for the Galaxy3D presentation core
//!
//! Only failures that stop an operation outright are reported as [`Error`].
//! Recoverable swapchain conditions (suboptimal, timeout, fullscreen loss)
//! travel as [`crate::status::Status`] and are handled by the engine itself.

use std::fmt;

/// Result type for presentation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Presentation errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (surface, swapchain, device)
    BackendError(String),

    /// Initialization failed (engine, swapchain creation)
    InitializationFailed(String),

    /// No swapchain to bind an onscreen frame to
    SwapchainUnavailable,

    /// Surface does not support the selected swapchain configuration
    UnsupportedConfig(String),

    /// Operation requires a running engine
    NotRunning,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::SwapchainUnavailable => write!(f, "Swapchain unavailable"),
            Error::UnsupportedConfig(msg) => write!(f, "Unsupported swapchain config: {}", msg),
            Error::NotRunning => write!(f, "Presentation engine is not running"),
        }
    }
}

impl std::error::Error for Error {}

/// Log an ERROR message with file:line and build an [`Error::BackendError`]
///
/// # Example
///
/// ```ignore
/// return Err(engine_err!("galaxy3d::Swapchain", "Failed to present image {}", index));
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::log::log_detailed(
            $crate::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!(),
        );
        $crate::error::Error::BackendError(message)
    }};
}

/// Log an ERROR message and return early with an [`Error::BackendError`]
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

/// Status codes reported by swapchain and device operations
///
/// These mirror the platform results a presentation backend can observe.
/// Only `Ok` and `Suboptimal` mean the operation produced something usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    /// Operation completed
    #[default]
    Ok,
    /// Request refused without side effects (e.g. an acquire is already pending)
    Declined,
    /// No image became available in time, retry later
    Timeout,
    /// Backend is not ready yet, retry later
    NotReady,
    /// Operation completed, but the swapchain no longer matches the surface
    Suboptimal,
    /// Exclusive fullscreen mode was revoked by the system
    FullscreenLost,
    /// Operation cancelled, the swapchain is out of date
    ErrorCancelled,
    /// Surface is gone (window destroyed)
    ErrorSurfaceLost,
    /// Device was lost
    ErrorDeviceLost,
    /// Loop exited because the awaited condition was met
    Suspended,
}

impl Status {
    /// Whether the operation produced a usable result
    pub fn is_success(self) -> bool {
        matches!(self, Status::Ok | Status::Suboptimal)
    }

    /// Whether the swapchain must be rebuilt after this result
    pub fn requires_deprecation(self) -> bool {
        matches!(
            self,
            Status::Suboptimal | Status::FullscreenLost | Status::ErrorCancelled
        )
    }

    /// Whether the operation should simply be retried later
    pub fn is_retryable(self) -> bool {
        matches!(self, Status::Timeout | Status::NotReady)
    }
}

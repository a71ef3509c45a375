/// Monotonic clock used for pacing and telemetry
///
/// All engine timestamps are microseconds since an arbitrary origin.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic microsecond clock
pub trait Clock: Send + Sync {
    /// Current time in microseconds
    fn now(&self) -> u64;
}

/// Clock backed by [`Instant`]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// Manually advanced clock for deterministic pacing tests and replays
///
/// Clones share the same time source.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self { now: Arc::new(AtomicU64::new(start)) }
    }

    /// Move the clock forward by `micros`
    pub fn advance(&self, micros: u64) {
        self.now.fetch_add(micros, Ordering::SeqCst);
    }

    /// Jump to an absolute time (never backwards)
    pub fn set(&self, micros: u64) {
        self.now.fetch_max(micros, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Frame timing and presentation telemetry
///
/// The engine keeps rolling averages over the last [`FRAME_AVERAGE_COUNT`]
/// samples for three intervals:
/// - presentation interval: time between two presents
/// - frame time: CPU time from frame start to frame end
/// - device frame time: GPU submission time reported by the frame queue

/// Number of samples in every moving average
pub const FRAME_AVERAGE_COUNT: usize = 20;

/// Fixed-window moving average over `u64` samples
#[derive(Debug, Clone)]
pub struct MovingAverage<const N: usize> {
    values: [u64; N],
    next: usize,
    filled: usize,
}

impl<const N: usize> MovingAverage<N> {
    pub fn new() -> Self {
        Self { values: [0; N], next: 0, filled: 0 }
    }

    pub fn add_value(&mut self, value: u64) {
        if N == 0 {
            return;
        }
        self.values[self.next] = value;
        self.next = (self.next + 1) % N;
        self.filled = (self.filled + 1).min(N);
    }

    /// Average of the recorded samples (0 when empty)
    pub fn average(&self) -> u64 {
        if self.filled == 0 {
            return 0;
        }
        let sum: u128 = self.values[..self.filled].iter().map(|v| *v as u128).sum();
        (sum / self.filled as u128) as u64
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn reset(&mut self) {
        self.values = [0; N];
        self.next = 0;
        self.filled = 0;
    }
}

impl<const N: usize> Default for MovingAverage<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one presentation interval update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameTimeInfo {
    /// Interval since the previous present
    pub dt: u64,
    /// Rolling average of `dt`
    pub avg: u64,
    /// Clock value of this present
    pub clock: u64,
}

/// Timing reported by the frame queue when a frame completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameTiming {
    pub time_start: u64,
    pub time_end: u64,
    /// GPU submission time, 0 if the queue could not measure it
    pub submission_time: u64,
}

/// Rolling presentation statistics
#[derive(Debug, Clone, Default)]
pub struct PresentationTelemetry {
    last_presentation_time: u64,
    last_presentation_interval: u64,
    avg_presentation_interval: MovingAverage<FRAME_AVERAGE_COUNT>,

    last_frame_time: u64,
    avg_frame_time: MovingAverage<FRAME_AVERAGE_COUNT>,

    last_device_frame_time: u64,
    avg_fence_interval: MovingAverage<FRAME_AVERAGE_COUNT>,
}

impl PresentationTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a present at `clock`
    pub fn update_presentation_interval(&mut self, clock: u64) -> FrameTimeInfo {
        let dt = clock.saturating_sub(self.last_presentation_time);
        self.last_presentation_interval = dt;
        self.avg_presentation_interval.add_value(dt);
        self.last_presentation_time = clock;
        FrameTimeInfo {
            dt,
            avg: self.avg_presentation_interval.average(),
            clock,
        }
    }

    /// Record a completed frame
    pub fn record_frame(&mut self, timing: &FrameTiming) {
        self.last_frame_time = timing.time_end.saturating_sub(timing.time_start);
        self.avg_frame_time.add_value(self.last_frame_time);

        if timing.submission_time != 0 {
            self.last_device_frame_time = timing.submission_time;
            self.avg_fence_interval.add_value(timing.submission_time);
        }
    }

    pub fn last_frame_interval(&self) -> u64 {
        self.last_presentation_interval
    }

    pub fn avg_frame_interval(&self) -> u64 {
        self.avg_presentation_interval.average()
    }

    pub fn last_frame_time(&self) -> u64 {
        self.last_frame_time
    }

    pub fn avg_frame_time(&self) -> u64 {
        self.avg_frame_time.average()
    }

    pub fn last_device_frame_time(&self) -> u64 {
        self.last_device_frame_time
    }

    pub fn avg_device_frame_time(&self) -> u64 {
        self.avg_fence_interval.average()
    }
}

#[cfg(test)]
#[path = "timing_tests.rs"]
mod tests;

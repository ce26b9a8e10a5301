use std::time::Instant;

/// Source of elapsed time for the frame loop.
pub trait Clock {
    /// Seconds since the clock started. Monotonic, never reset.
    fn elapsed(&self) -> f32;
}

/// Wall-clock time since construction.
#[derive(Debug)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn elapsed(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }
}

/// Any `Fn() -> f32` works as a clock, which lets callers drive time by hand.
impl<F: Fn() -> f32> Clock for F {
    fn elapsed(&self) -> f32 {
        self()
    }
}

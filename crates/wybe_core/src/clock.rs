//! Time source for the tick loop.

use std::time::{Duration, Instant};

/// Monotonic simulation time, read once per tick.
pub trait Clock: Send {
    /// Advance to the current tick and return elapsed time since start.
    fn advance(&mut self) -> Duration;
}

/// Wall-clock backed monotonic time.
#[derive(Debug, Clone)]
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
    fn advance(&mut self) -> Duration {
        self.start.elapsed()
    }
}

/// Deterministic clock: every tick moves time forward by a fixed step.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Duration,
    step: Duration,
}

impl ManualClock {
    pub fn new(step: Duration) -> Self {
        Self {
            now: Duration::ZERO,
            step,
        }
    }
}

impl Clock for ManualClock {
    fn advance(&mut self) -> Duration {
        self.now += self.step;
        self.now
    }
}

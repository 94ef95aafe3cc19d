//! Frame timing.
//!
//! The run loop asks a [`Clock`] for one timestamp per frame and, unless the
//! engine is headless, asks it to wait out the rest of the frame budget.
//! [`SystemClock`] uses wall time; [`FixedClock`] advances by exactly one
//! step per frame so headless runs and tests are reproducible.

use std::time::{Duration, Instant};

/// Time source for the run loop.
pub trait Clock {
    /// Timestamp of the frame about to run, measured from the clock's own
    /// origin. Called exactly once per frame.
    fn frame_start(&mut self) -> Duration;

    /// Block until `budget` has elapsed since `started`.
    fn wait_out(&mut self, started: Duration, budget: Duration);
}

/// Target duration of one frame at `fps`. Zero for `fps == 0`.
pub fn frame_budget(fps: u32) -> Duration {
    if fps == 0 {
        Duration::ZERO
    } else {
        Duration::from_secs_f64(1.0 / f64::from(fps))
    }
}

// ---------------------------------------------------------------------------
// SystemClock
// ---------------------------------------------------------------------------

/// Wall-clock time via [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn frame_start(&mut self) -> Duration {
        self.origin.elapsed()
    }

    fn wait_out(&mut self, started: Duration, budget: Duration) {
        let spent = self.origin.elapsed().saturating_sub(started);
        if let Some(remaining) = budget.checked_sub(spent) {
            std::thread::sleep(remaining);
        }
    }
}

// ---------------------------------------------------------------------------
// FixedClock
// ---------------------------------------------------------------------------

/// Simulated time that advances one fixed step per frame and never sleeps.
///
/// Frame `n` starts at `n * step`, so `delta_time` is exactly `step` from the
/// second frame on.
#[derive(Debug, Clone)]
pub struct FixedClock {
    step: Duration,
    frames: u32,
}

impl FixedClock {
    /// One step per frame at `fps`.
    pub fn new(fps: u32) -> Self {
        Self::with_step(frame_budget(fps))
    }

    pub fn with_step(step: Duration) -> Self {
        Self { step, frames: 0 }
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Frames started so far.
    pub fn frames(&self) -> u32 {
        self.frames
    }
}

impl Clock for FixedClock {
    fn frame_start(&mut self) -> Duration {
        let now = self.step * self.frames;
        self.frames = self.frames.saturating_add(1);
        now
    }

    fn wait_out(&mut self, _started: Duration, _budget: Duration) {}
}

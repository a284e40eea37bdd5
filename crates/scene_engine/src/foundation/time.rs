//! Time management utilities

use std::time::{Duration, Instant};

/// Accumulates variable frame time and hands out fixed simulation steps
#[derive(Debug, Clone)]
pub struct FixedStep {
    step: f32,
    accumulator: f32,
    max_steps_per_frame: u32,
}

impl FixedStep {
    /// Create an accumulator producing steps of `step` seconds
    pub fn new(step: f32) -> Self {
        Self {
            step,
            accumulator: 0.0,
            max_steps_per_frame: 8,
        }
    }

    /// Length of one step in seconds
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Add frame time and return how many fixed steps are due
    ///
    /// Clamped so a long stall (e.g. a synchronous level load) cannot
    /// trigger a spiral of catch-up steps.
    pub fn advance(&mut self, delta_time: f32) -> u32 {
        self.accumulator += delta_time.max(0.0);
        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps_per_frame {
            self.accumulator -= self.step;
            steps += 1;
        }
        if steps == self.max_steps_per_frame {
            self.accumulator = 0.0;
        }
        steps
    }
}

/// Simple stopwatch for measuring elapsed time
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    pub fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create a new stopwatch and start it immediately
    pub fn start_new() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start();
        stopwatch
    }

    /// Start the stopwatch
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Stop the stopwatch and accumulate elapsed time
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time {
            self.elapsed += start.elapsed();
            self.start_time = None;
        }
    }

    /// Get the elapsed time
    pub fn elapsed(&self) -> Duration {
        let current_elapsed = self.start_time.map_or(Duration::ZERO, |start| start.elapsed());
        self.elapsed + current_elapsed
    }

    /// Get the elapsed time in milliseconds
    pub fn elapsed_millis(&self) -> f32 {
        self.elapsed().as_secs_f32() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_step_accumulates_partial_frames() {
        let mut fixed = FixedStep::new(0.5);
        assert_eq!(fixed.advance(0.3), 0);
        assert_eq!(fixed.advance(0.3), 1);
        assert_eq!(fixed.advance(1.0), 2);
    }

    #[test]
    fn test_fixed_step_clamps_long_stalls() {
        let mut fixed = FixedStep::new(0.01);
        assert_eq!(fixed.advance(10.0), 8);
        assert_eq!(fixed.advance(0.0), 0);
    }

    #[test]
    fn test_stopwatch_accumulates_only_while_running() {
        let mut stopwatch = Stopwatch::new();
        assert_eq!(stopwatch.elapsed(), Duration::ZERO);
        stopwatch.start();
        stopwatch.stop();
        let stopped = stopwatch.elapsed();
        assert_eq!(stopwatch.elapsed(), stopped);
    }
}

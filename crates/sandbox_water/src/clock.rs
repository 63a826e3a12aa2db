//! Fixed-rate stepping from variable frame times.

/// Accumulates frame time and reports how many fixed steps are due.
#[derive(Clone, Debug)]
pub struct FixedStep {
    interval: f32,
    accumulator: f32,
    max_steps: u32,
    /// Steps dropped because a single advance exceeded `max_steps`.
    pub dropped_steps: u64,
}

impl FixedStep {
    pub fn new(interval: f32, max_steps: u32) -> Self {
        Self {
            interval: interval.max(f32::EPSILON),
            accumulator: 0.0,
            max_steps: max_steps.max(1),
            dropped_steps: 0,
        }
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Add `dt` seconds and return the number of steps to run now.
    pub fn advance(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.max(0.0);
        let due = (self.accumulator / self.interval).floor();
        self.accumulator -= due * self.interval;
        let due = due as u64;
        if due > self.max_steps as u64 {
            let dropped = due - self.max_steps as u64;
            self.dropped_steps += dropped;
            log::warn!("Falling behind, dropping {} fixed steps", dropped);
            return self.max_steps;
        }
        due as u32
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

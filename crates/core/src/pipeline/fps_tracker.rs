use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::shared::constants::FPS_WINDOW;

/// Processing rate over a sliding window of recent frame instants.
pub struct FpsTracker {
    window: VecDeque<Instant>,
    capacity: usize,
    started: Option<Instant>,
}

impl FpsTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity.max(2)),
            capacity: capacity.max(2),
            started: None,
        }
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, now: Instant) {
        self.started.get_or_insert(now);
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(now);
    }

    /// Frames per second across the window; 0 until two frames are seen.
    pub fn fps(&self) -> f64 {
        let (Some(first), Some(last)) = (self.window.front(), self.window.back()) else {
            return 0.0;
        };
        let span = last.duration_since(*first).as_secs_f64();
        if self.window.len() < 2 || span <= 0.0 {
            return 0.0;
        }
        (self.window.len() - 1) as f64 / span
    }

    /// Time since the first tick.
    pub fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.started = None;
    }
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new(FPS_WINDOW)
    }
}

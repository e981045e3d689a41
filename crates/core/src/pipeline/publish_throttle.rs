use std::time::{Duration, Instant};

/// Minimum spacing between snapshot publications while running freely.
/// Stepped frames always publish so each one is shown.
pub struct PublishThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl PublishThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn should_publish(&mut self, stepping: bool) -> bool {
        self.should_publish_at(Instant::now(), stepping)
    }

    pub fn should_publish_at(&mut self, now: Instant, stepping: bool) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => stepping || now.duration_since(last) >= self.interval,
        };
        if due {
            self.last = Some(now);
        }
        due
    }
}

use std::time::{Duration, Instant};

/// Tracks an events-per-second rate from discrete `tick()` calls, emitting a
/// fresh rate at most once per second.
#[derive(Debug)]
pub struct FpsTracker {
    last_update: Instant,
    count: u64,
}

impl FpsTracker {
    pub fn new() -> Self {
        Self {
            last_update: Instant::now(),
            count: 0,
        }
    }

    pub fn tick(&mut self) -> Option<f64> {
        self.count += 1;
        let elapsed = self.last_update.elapsed();
        if elapsed >= Duration::from_secs(1) {
            let fps = self.count as f64 / elapsed.as_secs_f64();
            self.last_update = Instant::now();
            self.count = 0;
            Some(fps)
        } else {
            None
        }
    }
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new()
    }
}

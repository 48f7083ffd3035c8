//! Clock abstraction so the pacer's deadline loop and the client engine's
//! age computation can be driven by virtual time in tests.

use std::time::{Duration, Instant, SystemTime};

/// Clock trait for time abstraction.
pub trait Clock: Send + Sync {
    /// Monotonic "now", used for deadlines and sleeps.
    fn now(&self) -> Instant;
    /// Wall-clock "now", used for `age_ms` computation against server timestamps.
    fn wall_now(&self) -> SystemTime;
    /// Sleep for the specified duration.
    fn sleep(&self, duration: Duration);
}

/// Real-time clock implementation.
#[derive(Default)]
pub struct RealClock;

impl RealClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock for deterministic testing of the pacer and the sync engine.
pub struct TestClock {
    current: std::sync::Mutex<(Instant, SystemTime)>,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            current: std::sync::Mutex::new((Instant::now(), SystemTime::now())),
        }
    }

    pub fn new_with_start(monotonic_start: Instant, wall_start: SystemTime) -> Self {
        Self {
            current: std::sync::Mutex::new((monotonic_start, wall_start)),
        }
    }

    /// Advance both the monotonic and wall-clock views of the virtual clock.
    pub fn advance(&self, duration: Duration) {
        let mut cur = self.current.lock().unwrap();
        cur.0 += duration;
        cur.1 += duration;
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.current.lock().unwrap().0
    }

    fn wall_now(&self) -> SystemTime {
        self.current.lock().unwrap().1
    }

    fn sleep(&self, duration: Duration) {
        // In virtual time, sleeping just advances the clock.
        self.advance(duration);
        std::thread::yield_now();
    }
}

/// Thread-safe clock handle shared across the pacer/session/engine threads.
pub type SharedClock = std::sync::Arc<dyn Clock>;

pub fn real_clock() -> SharedClock {
    std::sync::Arc::new(RealClock::new())
}

pub fn test_clock() -> SharedClock {
    std::sync::Arc::new(TestClock::new())
}

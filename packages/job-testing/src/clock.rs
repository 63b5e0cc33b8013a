//! A [`Clock`] the test can move by hand, so retry back-off and recovery
//! timeouts don't require sleeping through real wall-clock windows.
//!
//! Grounded on `job_core::clock::Clock`'s own doc comment, which already
//! calls out that tests want "a fake" instead of `SystemClock` — this is
//! that fake.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use job_core::Clock;

/// Starts at construction time (or an explicit instant) and only moves
/// when [`FakeClock::advance`] or [`FakeClock::set`] is called.
pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
}

impl FakeClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Starts at the real current instant, then stands still.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap() = instant;
    }

    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

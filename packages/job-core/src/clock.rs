//! Abstract "now", so manager and store tests can control time instead of
//! sleeping through real back-off windows.

use chrono::{DateTime, Utc};

/// Source of the current instant. Production code uses [`SystemClock`];
/// tests use a fake from the `job-testing` crate.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock, backed by [`Utc::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

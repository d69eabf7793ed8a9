//! Time source abstraction.
//!
//! Components that reason about elapsed time take a [`Clock`] so tests can drive time
//! deterministically.

use std::time::Instant;

use chrono::{DateTime, Utc};

/// A source of monotonic and wall-clock time.
pub trait Clock: Send + Sync + 'static {
    /// Monotonic instant used for window arithmetic.
    fn now(&self) -> Instant;

    /// Wall-clock time used for persisted timestamps.
    fn utc_now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

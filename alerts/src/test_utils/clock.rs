use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::clock::Clock;

/// Manually driven [`Clock`]. Clones share the same time.
///
/// Monotonic and wall-clock time advance together.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<(Instant, DateTime<Utc>)>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(utc: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new((Instant::now(), utc))),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap();
        current.0 += duration;
        current.1 += chrono::Duration::from_std(duration).unwrap();
    }

    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.current.lock().unwrap().0
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.current.lock().unwrap().1
    }
}

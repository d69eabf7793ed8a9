use std::collections::VecDeque;
use std::time::{Duration, Instant};

use alerts_config::shared::RateLimitConfig;

use crate::error::{AlertsResult, ErrorKind};
use crate::bail;

/// Outcome of a single rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the request was accepted.
    pub success: bool,
    /// Requests still allowed in the current window, `0` on rejection.
    pub remaining: u32,
    /// Configured maximum requests per window.
    pub limit: u32,
    /// Milliseconds until the oldest recorded request leaves the window. Only set on
    /// rejection and always greater than zero.
    pub retry_after_ms: Option<u64>,
}

impl RateLimitResult {
    /// Returns the retry delay in whole seconds, rounded up.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after_ms.map(|ms| ms.div_ceil(1_000))
    }

    /// Converts a rejection into a [`ErrorKind::RateLimitExceeded`] error.
    pub fn ensure_accepted(self) -> AlertsResult<Self> {
        if !self.success {
            bail!(
                ErrorKind::RateLimitExceeded,
                "too many requests",
                format!(
                    "limit {} reached, retry after {} ms",
                    self.limit,
                    self.retry_after_ms.unwrap_or_default()
                )
            );
        }

        Ok(self)
    }
}

/// Accepted request instants for one identifier, ascending.
#[derive(Debug, Clone, Default)]
pub struct RateLimitEntry {
    timestamps: VecDeque<Instant>,
}

impl RateLimitEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn oldest(&self) -> Option<Instant> {
        self.timestamps.front().copied()
    }

    /// Drops every timestamp at or before `now - window`.
    pub fn prune(&mut self, now: Instant, window: Duration) {
        // Before the first full window has elapsed nothing can be stale.
        let Some(cutoff) = now.checked_sub(window) else {
            return;
        };

        while let Some(&oldest) = self.timestamps.front() {
            if oldest > cutoff {
                break;
            }
            self.timestamps.pop_front();
        }
    }

    /// Prunes the entry, then either records `now` or rejects the request.
    pub fn check(&mut self, now: Instant, config: &RateLimitConfig) -> RateLimitResult {
        let window = config.window();
        self.prune(now, window);

        let limit = config.max_requests;
        let count = self.timestamps.len() as u64;

        if count >= u64::from(limit) {
            let retry_after = self
                .oldest()
                .map(|oldest| (oldest + window).saturating_duration_since(now))
                .unwrap_or(window);

            return RateLimitResult {
                success: false,
                remaining: 0,
                limit,
                retry_after_ms: Some(ceil_millis(retry_after).max(1)),
            };
        }

        self.timestamps.push_back(now);

        RateLimitResult {
            success: true,
            remaining: limit - self.timestamps.len() as u32,
            limit,
            retry_after_ms: None,
        }
    }
}

fn ceil_millis(duration: Duration) -> u64 {
    let millis = duration.as_nanos().div_ceil(1_000_000);
    u64::try_from(millis).unwrap_or(u64::MAX)
}

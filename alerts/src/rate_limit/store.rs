use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use alerts_config::shared::RateLimitConfig;
use dashmap::DashMap;

use crate::error::AlertsResult;
use crate::rate_limit::entry::{RateLimitEntry, RateLimitResult};

/// Backing storage for rate limit entries.
///
/// Implementations must apply [`RateLimitStore::check`] atomically per identifier:
/// concurrent checks for the same identifier are serialized, checks for different
/// identifiers may run in parallel.
pub trait RateLimitStore {
    /// Prunes the identifier's entry and records or rejects a request at `now`.
    fn check(
        &self,
        identifier: &str,
        now: Instant,
        config: &RateLimitConfig,
    ) -> impl Future<Output = AlertsResult<RateLimitResult>> + Send;

    /// Prunes every entry and evicts the ones left empty, returning how many were evicted.
    fn sweep(&self, now: Instant, window: Duration)
    -> impl Future<Output = AlertsResult<usize>> + Send;

    /// Returns the number of tracked identifiers.
    fn len(&self) -> impl Future<Output = AlertsResult<usize>> + Send;
}

/// Process-local [`RateLimitStore`] backed by a sharded concurrent map.
///
/// The shard lock held through [`DashMap::entry`] provides the per-identifier
/// serialization.
#[derive(Debug, Clone, Default)]
pub struct MemoryRateLimitStore {
    entries: Arc<DashMap<String, RateLimitEntry>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    async fn check(
        &self,
        identifier: &str,
        now: Instant,
        config: &RateLimitConfig,
    ) -> AlertsResult<RateLimitResult> {
        if let Some(mut entry) = self.entries.get_mut(identifier) {
            return Ok(entry.check(now, config));
        }

        let result = self
            .entries
            .entry(identifier.to_owned())
            .or_default()
            .check(now, config);

        Ok(result)
    }

    async fn sweep(&self, now: Instant, window: Duration) -> AlertsResult<usize> {
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            entry.prune(now, window);
            !entry.is_empty()
        });

        Ok(before.saturating_sub(self.entries.len()))
    }

    async fn len(&self) -> AlertsResult<usize> {
        Ok(self.entries.len())
    }
}

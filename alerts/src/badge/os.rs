use async_trait::async_trait;

use crate::error::AlertsResult;

/// OS-level badge indicator (app icon badge, browser app badge).
#[async_trait]
pub trait OsBadge: Send + Sync {
    async fn set_count(&self, count: u32) -> AlertsResult<()>;

    async fn clear(&self) -> AlertsResult<()>;
}

/// [`OsBadge`] for hosts without a badge indicator.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBadge;

#[async_trait]
impl OsBadge for NoopBadge {
    async fn set_count(&self, _count: u32) -> AlertsResult<()> {
        Ok(())
    }

    async fn clear(&self) -> AlertsResult<()> {
        Ok(())
    }
}

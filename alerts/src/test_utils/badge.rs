use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::badge::OsBadge;
use crate::bail;
use crate::error::{AlertsResult, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeCall {
    SetCount(u32),
    Clear,
}

/// [`OsBadge`] that records every call and can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingBadge {
    calls: Arc<Mutex<Vec<BadgeCall>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingBadge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls are still recorded while failing.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<BadgeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Option<BadgeCall> {
        self.calls.lock().unwrap().last().copied()
    }

    fn record(&self, call: BadgeCall) -> AlertsResult<()> {
        self.calls.lock().unwrap().push(call);

        if self.failing.load(Ordering::SeqCst) {
            bail!(ErrorKind::IoError, "badge api unavailable");
        }

        Ok(())
    }
}

#[async_trait]
impl OsBadge for RecordingBadge {
    async fn set_count(&self, count: u32) -> AlertsResult<()> {
        self.record(BadgeCall::SetCount(count))
    }

    async fn clear(&self) -> AlertsResult<()> {
        self.record(BadgeCall::Clear)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notifications::records::{IncidentStatus, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Incident,
    Update,
}

/// A display-ready notification.
///
/// Updates carry their parent incident's title, place, severity and status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationItem {
    /// Unique across kinds: `incident:<id>` or `update:<id>`.
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub place: Option<String>,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub occurred_at: DateTime<Utc>,
}

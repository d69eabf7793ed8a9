use std::cmp::Reverse;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::notifications::item::{NotificationItem, NotificationKind};
use crate::notifications::records::{IncidentRecord, IncidentUpdateRecord};

/// Notifications split by whether they happened after the user last looked.
///
/// Both lists are ordered by `occurred_at`, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationFeed {
    pub unread: Vec<NotificationItem>,
    pub read: Vec<NotificationItem>,
}

impl NotificationFeed {
    pub fn unread_count(&self) -> usize {
        self.unread.len()
    }

    pub fn len(&self) -> usize {
        self.unread.len() + self.read.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unread.is_empty() && self.read.is_empty()
    }

    /// Splits the same items again against a new `last_seen_at`.
    pub fn repartition(&self, last_seen_at: Option<DateTime<Utc>>) -> NotificationFeed {
        let items = self.unread.iter().chain(&self.read).cloned().collect();
        partition(items, last_seen_at)
    }
}

/// Merges refetched incidents and updates into a [`NotificationFeed`].
///
/// Duplicate ids keep their first occurrence. Updates whose incident is not part of
/// `incidents` are dropped since they cannot be displayed without it.
pub fn aggregate(
    incidents: &[IncidentRecord],
    updates: &[IncidentUpdateRecord],
    last_seen_at: Option<DateTime<Utc>>,
) -> NotificationFeed {
    let mut by_id: HashMap<&str, &IncidentRecord> = HashMap::with_capacity(incidents.len());
    let mut items = Vec::with_capacity(incidents.len() + updates.len());

    for incident in incidents {
        if let Entry::Vacant(entry) = by_id.entry(incident.id.as_str()) {
            entry.insert(incident);
            items.push(incident_item(incident));
        }
    }

    let mut seen_updates = HashSet::with_capacity(updates.len());
    let mut orphaned = 0usize;
    for update in updates {
        if !seen_updates.insert(update.id.as_str()) {
            continue;
        }

        match by_id.get(update.incident_id.as_str()) {
            Some(incident) => items.push(update_item(update, incident)),
            None => orphaned += 1,
        }
    }

    if orphaned > 0 {
        debug!(orphaned, "dropped updates without a known incident");
    }

    partition(items, last_seen_at)
}

fn partition(
    mut items: Vec<NotificationItem>,
    last_seen_at: Option<DateTime<Utc>>,
) -> NotificationFeed {
    items.sort_by(|a, b| {
        Reverse(a.occurred_at)
            .cmp(&Reverse(b.occurred_at))
            .then_with(|| a.id.cmp(&b.id))
    });

    let (unread, read) = items.into_iter().partition(|item| {
        last_seen_at.is_none_or(|last_seen_at| item.occurred_at > last_seen_at)
    });

    NotificationFeed { unread, read }
}

fn incident_item(incident: &IncidentRecord) -> NotificationItem {
    NotificationItem {
        id: format!("incident:{}", incident.id),
        kind: NotificationKind::Incident,
        title: incident.title.clone(),
        body: incident.description.clone(),
        place: incident.place.clone(),
        severity: incident.severity,
        status: incident.status,
        occurred_at: incident.created_at,
    }
}

fn update_item(update: &IncidentUpdateRecord, incident: &IncidentRecord) -> NotificationItem {
    NotificationItem {
        id: format!("update:{}", update.id),
        kind: NotificationKind::Update,
        title: incident.title.clone(),
        body: Some(update.message.clone()),
        place: incident.place.clone(),
        severity: incident.severity,
        status: incident.status,
        occurred_at: update.created_at,
    }
}

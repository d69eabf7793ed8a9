//! Refetch-based notification list.
//!
//! Change events only tell us that something changed. The [`Refresher`] refetches the
//! records from a [`NotificationSource`] and [`aggregate`] turns them into a
//! [`NotificationFeed`] split into unread and read items.

mod aggregator;
mod item;
mod records;
mod refresher;
mod source;

pub use aggregator::{NotificationFeed, aggregate};
pub use item::{NotificationItem, NotificationKind};
pub use records::{IncidentRecord, IncidentStatus, IncidentUpdateRecord, Severity};
pub use refresher::{Refresher, RefresherHandle};
pub use source::{
    INCIDENT_UPDATES_TABLE, INCIDENTS_TABLE, MemoryNotificationSource, NotificationSnapshot,
    NotificationSource, RestNotificationSource,
};

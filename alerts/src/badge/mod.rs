//! Unread counter per installation, mirrored to the OS badge.

mod lifecycle;
mod os;
mod state;
mod synchronizer;

pub use lifecycle::{LifecycleEvent, LifecycleListenerHandle, spawn_lifecycle_listener};
pub use os::{NoopBadge, OsBadge};
pub use state::{BADGE_STATE_KEY, BadgeState};
pub use synchronizer::{BadgeEvent, BadgeSynchronizer};

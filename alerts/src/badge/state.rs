use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Local storage key of the persisted [`BadgeState`].
pub const BADGE_STATE_KEY: &str = "badge_state";

/// Badge state of one installation.
///
/// `version` increases by one on every mutation. When several surfaces share the same
/// local storage, the persisted state with the highest version is the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeState {
    pub unread_count: u32,
    pub last_seen_at: Option<DateTime<Utc>>,
    #[serde(default = "default_sound_enabled")]
    pub sound_enabled: bool,
    #[serde(default)]
    pub version: u64,
}

fn default_sound_enabled() -> bool {
    true
}

impl Default for BadgeState {
    fn default() -> Self {
        Self {
            unread_count: 0,
            last_seen_at: None,
            sound_enabled: default_sound_enabled(),
            version: 0,
        }
    }
}

impl BadgeState {
    /// Returns `true` if `occurred_at` happened after the user last cleared the badge.
    pub fn is_unseen(&self, occurred_at: DateTime<Utc>) -> bool {
        self.last_seen_at
            .is_none_or(|last_seen_at| occurred_at > last_seen_at)
    }
}

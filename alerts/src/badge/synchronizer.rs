use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use crate::badge::os::OsBadge;
use crate::badge::state::{BADGE_STATE_KEY, BadgeState};
use crate::clock::Clock;
use crate::error::{AlertsResult, ErrorKind};
use crate::storage::LocalStore;
use crate::alerts_error;

/// Events that move the badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeEvent {
    /// A notification was delivered while the app was in the foreground.
    NotificationReceived,
    /// The user interacted with a notification.
    NotificationOpened,
    /// The app returned to the foreground.
    AppForeground,
    /// The page became visible.
    BecameVisible,
}

/// What to mirror to the OS badge after a mutation.
#[derive(Debug, Clone, Copy)]
enum Mirror {
    None,
    Count,
    Clear,
}

/// Owns the [`BadgeState`] of one installation.
///
/// Mutations are serialized: each one reloads the persisted state, adopts it when another
/// surface wrote a newer version, applies the change, bumps the version and persists it.
/// The OS badge is then mirrored on a best-effort basis; mirroring and persistence
/// failures are logged and never undo the counter update.
pub struct BadgeSynchronizer<L> {
    store: L,
    os_badge: Arc<dyn OsBadge>,
    clock: Arc<dyn Clock>,
    state: Mutex<BadgeState>,
    state_tx: watch::Sender<BadgeState>,
}

impl<L> BadgeSynchronizer<L>
where
    L: LocalStore + Send + Sync,
{
    /// Restores the persisted state, falling back to an empty badge.
    pub async fn load(
        store: L,
        os_badge: Arc<dyn OsBadge>,
        clock: Arc<dyn Clock>,
    ) -> AlertsResult<Self> {
        let state = read_state(&store).await?.unwrap_or_default();
        let (state_tx, _) = watch::channel(state.clone());

        debug!(
            unread_count = state.unread_count,
            version = state.version,
            "badge state loaded"
        );

        Ok(Self {
            store,
            os_badge,
            clock,
            state: Mutex::new(state),
            state_tx,
        })
    }

    pub async fn state(&self) -> BadgeState {
        self.state.lock().await.clone()
    }

    /// Returns a receiver that observes every committed state.
    pub fn subscribe(&self) -> watch::Receiver<BadgeState> {
        self.state_tx.subscribe()
    }

    /// Counts one foreground-delivered notification.
    pub async fn increment(&self) -> BadgeState {
        self.mutate(Mirror::Count, |state| {
            state.unread_count = state.unread_count.saturating_add(1);
        })
        .await
    }

    /// Resets the counter and marks everything up to now as seen.
    pub async fn clear(&self) -> BadgeState {
        let now = self.clock.utc_now();
        self.mutate(Mirror::Clear, move |state| {
            state.unread_count = 0;
            state.last_seen_at = Some(now);
        })
        .await
    }

    pub async fn handle(&self, event: BadgeEvent) -> BadgeState {
        match event {
            BadgeEvent::NotificationReceived => self.increment().await,
            BadgeEvent::NotificationOpened
            | BadgeEvent::AppForeground
            | BadgeEvent::BecameVisible => self.clear().await,
        }
    }

    pub async fn set_sound_enabled(&self, enabled: bool) -> BadgeState {
        self.mutate(Mirror::None, move |state| state.sound_enabled = enabled)
            .await
    }

    pub async fn sound_enabled(&self) -> bool {
        self.state.lock().await.sound_enabled
    }

    async fn mutate<F>(&self, mirror: Mirror, apply: F) -> BadgeState
    where
        F: FnOnce(&mut BadgeState) + Send,
    {
        let mut state = self.state.lock().await;

        match read_state(&self.store).await {
            Ok(Some(persisted)) if persisted.version > state.version => {
                debug!(
                    local_version = state.version,
                    persisted_version = persisted.version,
                    "adopting newer persisted badge state"
                );
                *state = persisted;
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "failed to reload badge state"),
        }

        apply(&mut state);
        state.version += 1;

        if let Err(err) = write_state(&self.store, &state).await {
            warn!(error = %err, "failed to persist badge state");
        }

        let result = match mirror {
            Mirror::None => Ok(()),
            Mirror::Count => self.os_badge.set_count(state.unread_count).await,
            Mirror::Clear => self.os_badge.clear().await,
        };
        if let Err(err) = result {
            warn!(error = %err, "failed to mirror os badge");
        }

        self.state_tx.send_replace(state.clone());

        state.clone()
    }
}

async fn read_state<L: LocalStore>(store: &L) -> AlertsResult<Option<BadgeState>> {
    let Some(raw) = store.get(BADGE_STATE_KEY).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(state) => Ok(Some(state)),
        Err(err) => {
            warn!(error = %err, "discarding unreadable badge state");
            Ok(None)
        }
    }
}

async fn write_state<L: LocalStore>(store: &L, state: &BadgeState) -> AlertsResult<()> {
    let raw = serde_json::to_string(state).map_err(|err| {
        alerts_error!(
            ErrorKind::SerializationError,
            "failed to serialize badge state",
            source: err
        )
    })?;

    store.set(BADGE_STATE_KEY, raw).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badge::os::NoopBadge;
    use crate::clock::SystemClock;
    use crate::storage::MemoryStore;

    async fn synchronizer(store: MemoryStore) -> BadgeSynchronizer<MemoryStore> {
        BadgeSynchronizer::load(store, Arc::new(NoopBadge), Arc::new(SystemClock))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn every_mutation_bumps_the_version() {
        let badge = synchronizer(MemoryStore::new()).await;

        badge.increment().await;
        badge.set_sound_enabled(false).await;
        let state = badge.clear().await;

        assert_eq!(state.version, 3);
        assert_eq!(state.unread_count, 0);
        assert!(!state.sound_enabled);
        assert!(state.last_seen_at.is_some());
    }

    #[tokio::test]
    async fn state_survives_reload() {
        let store = MemoryStore::new();
        let badge = synchronizer(store.clone()).await;
        badge.increment().await;
        badge.increment().await;

        let reloaded = synchronizer(store).await;
        assert_eq!(reloaded.state().await.unread_count, 2);
    }

    #[tokio::test]
    async fn unreadable_state_falls_back_to_default() {
        let store = MemoryStore::new();
        store
            .set(BADGE_STATE_KEY, "{broken".to_owned())
            .await
            .unwrap();

        let badge = synchronizer(store).await;
        assert_eq!(badge.state().await, BadgeState::default());
        assert_eq!(badge.increment().await.unread_count, 1);
    }

    #[tokio::test]
    async fn subscribers_observe_committed_state() {
        let badge = synchronizer(MemoryStore::new()).await;
        let mut rx = badge.subscribe();

        badge.increment().await;

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().unread_count, 1);
    }
}

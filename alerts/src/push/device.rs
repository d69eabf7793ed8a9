use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AlertsResult;
use crate::storage::LocalStore;

/// Local storage key of the installation's device id.
pub const DEVICE_ID_KEY: &str = "device_id";

/// Identity of this installation, generated once and then persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    device_id: Uuid,
}

impl DeviceIdentity {
    /// Returns the persisted device id, generating and storing a new one if missing or
    /// unreadable.
    pub async fn load_or_create<L: LocalStore>(store: &L) -> AlertsResult<Self> {
        if let Some(raw) = store.get(DEVICE_ID_KEY).await? {
            match Uuid::parse_str(&raw) {
                Ok(device_id) => return Ok(Self { device_id }),
                Err(err) => warn!(error = %err, "stored device id is invalid, generating a new one"),
            }
        }

        let device_id = Uuid::new_v4();
        store.set(DEVICE_ID_KEY, device_id.to_string()).await?;
        info!(%device_id, "generated device id");

        Ok(Self { device_id })
    }

    pub fn device_id(&self) -> Uuid {
        self.device_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn device_id_is_stable_per_installation() {
        let store = MemoryStore::new();

        let first = DeviceIdentity::load_or_create(&store).await.unwrap();
        let second = DeviceIdentity::load_or_create(&store).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn invalid_device_id_is_replaced() {
        let store = MemoryStore::new();
        store.set(DEVICE_ID_KEY, "garbage".to_owned()).await.unwrap();

        let identity = DeviceIdentity::load_or_create(&store).await.unwrap();
        let stored = store.get(DEVICE_ID_KEY).await.unwrap().unwrap();

        assert_eq!(stored, identity.device_id().to_string());
    }
}

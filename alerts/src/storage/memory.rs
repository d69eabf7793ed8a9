use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::AlertsResult;
use crate::storage::base::LocalStore;

/// In-memory [`LocalStore`]. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    async fn get(&self, key: &str) -> AlertsResult<Option<String>> {
        let inner = self.inner.lock().await;

        Ok(inner.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> AlertsResult<()> {
        let mut inner = self.inner.lock().await;
        inner.insert(key.to_owned(), value);

        Ok(())
    }

    async fn remove(&self, key: &str) -> AlertsResult<()> {
        let mut inner = self.inner.lock().await;
        inner.remove(key);

        Ok(())
    }
}

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{AlertsResult, ErrorKind};
use crate::storage::base::LocalStore;
use crate::alerts_error;

/// [`LocalStore`] persisted as a single JSON object on disk.
///
/// Every write rewrites the whole file through a temporary sibling and a rename, so a
/// crash never leaves a truncated file behind. Writers within one process are
/// serialized by an internal lock.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> AlertsResult<BTreeMap<String, String>> {
        let contents = match tokio::fs::read(self.path.as_ref()).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };

        serde_json::from_slice(&contents).map_err(|err| {
            alerts_error!(
                ErrorKind::StoreError,
                "local store file is corrupted",
                format!("path: {}, error: {err}", self.path.display()),
                source: err
            )
        })
    }

    async fn write_all(&self, values: &BTreeMap<String, String>) -> AlertsResult<()> {
        let contents = serde_json::to_vec_pretty(values).map_err(|err| {
            alerts_error!(
                ErrorKind::SerializationError,
                "failed to serialize local store",
                source: err
            )
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, contents).await?;
        tokio::fs::rename(&tmp_path, self.path.as_ref()).await?;

        debug!(path = %self.path.display(), keys = values.len(), "local store written");

        Ok(())
    }
}

impl LocalStore for FileStore {
    async fn get(&self, key: &str) -> AlertsResult<Option<String>> {
        let _guard = self.lock.lock().await;
        let mut values = self.read_all().await?;

        Ok(values.remove(key))
    }

    async fn set(&self, key: &str, value: String) -> AlertsResult<()> {
        let _guard = self.lock.lock().await;
        let mut values = self.read_all().await?;
        values.insert(key.to_owned(), value);

        self.write_all(&values).await
    }

    async fn remove(&self, key: &str) -> AlertsResult<()> {
        let _guard = self.lock.lock().await;
        let mut values = self.read_all().await?;
        if values.remove(key).is_none() {
            return Ok(());
        }

        self.write_all(&values).await
    }
}

use secrecy::SecretString;
use serde::Deserialize;

/// REST endpoint of the Data Store service.
#[derive(Debug, Clone, Deserialize)]
pub struct DataStoreConfig {
    /// Project URL, e.g. `https://<project>.supabase.co`. Tables live under `/rest/v1`.
    pub url: String,
    pub api_key: SecretString,
    /// Maximum number of records fetched per table on refetch.
    #[serde(default = "default_notifications_limit")]
    pub notifications_limit: u32,
}

const fn default_notifications_limit() -> u32 {
    50
}

impl DataStoreConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: SecretString::new(api_key.into()),
            notifications_limit: default_notifications_limit(),
        }
    }
}

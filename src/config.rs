// bucket-sync/src/config.rs

use tracing::{debug, info};

/// Runtime configuration, passed explicitly to every component.
///
/// - `bucket`: the storage bucket; its name is also the dataset name
/// - `api_base_url`: knowledge-base API root, e.g. `https://kb.example.com/v1`
/// - `api_key`: bearer credential for the knowledge-base API
#[derive(Clone)]
pub struct SyncConfig {
    bucket: String,
    api_base_url: String,
    api_key: String,
}

impl SyncConfig {
    pub fn new(
        bucket: impl Into<String>,
        api_base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            api_base_url: api_base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// `path` appended to the base URL, tolerating a trailing slash on either side.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn trace_loaded(&self) {
        info!(
            bucket = %self.bucket,
            api_base_url = %self.api_base_url,
            api_key_set = !self.api_key.is_empty(),
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("bucket", &self.bucket)
            .field("api_base_url", &self.api_base_url)
            .finish_non_exhaustive()
    }
}

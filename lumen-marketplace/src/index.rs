//! Marketplace index cache: fetches the catalog and keeps the last good copy
//!
//! The catalog is held in memory and mirrored to `index.json` in the cache
//! directory. A failed fetch never touches either copy.

use crate::persist::{lock, read_json, write_json_atomic};
use crate::types::{MarketplaceIndex, PluginInfo};
use sdk::errors::HostError;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// Catalog published by the marketplace repository
pub const DEFAULT_INDEX_URL: &str =
    "https://raw.githubusercontent.com/led-matrix-plugins/marketplace/main/index.json";

/// User agent sent with every marketplace request
pub(crate) fn user_agent() -> String {
    format!("lumen-marketplace/{}", env!("CARGO_PKG_VERSION"))
}

/// In-memory and on-disk copy of the marketplace catalog
pub struct IndexCache {
    cache_file: PathBuf,
    cached: Mutex<Option<MarketplaceIndex>>,
    http: reqwest::Client,
    default_url: String,
}

impl IndexCache {
    /// Create a cache persisted at `cache_file`
    ///
    /// Metadata requests give up after `timeout`.
    pub fn new(
        cache_file: impl Into<PathBuf>,
        default_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, HostError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()
            .map_err(|e| HostError::Network(e.to_string()))?;

        Ok(Self {
            cache_file: cache_file.into(),
            cached: Mutex::new(None),
            http,
            default_url: default_url.into(),
        })
    }

    /// Fetch the catalog from `url` (or the default URL)
    ///
    /// On success the catalog replaces the cached copy. Every failure is
    /// logged and yields `None`.
    pub async fn fetch_index(&self, url: Option<&str>) -> Option<MarketplaceIndex> {
        let url = url.unwrap_or(&self.default_url);

        match self.download_index(url).await {
            Ok(index) => {
                tracing::info!(
                    "Fetched marketplace index from {} ({} plugins)",
                    url,
                    index.plugins.len()
                );
                if let Err(e) = self.update_index_cache(index.clone()) {
                    tracing::error!("Failed to persist marketplace index: {}", e);
                }
                Some(index)
            }
            Err(e) => {
                tracing::warn!("Failed to fetch marketplace index from {}: {}", url, e);
                None
            }
        }
    }

    async fn download_index(&self, url: &str) -> Result<MarketplaceIndex, HostError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| HostError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HostError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .json::<MarketplaceIndex>()
            .await
            .map_err(|e| HostError::Network(format!("invalid index document: {}", e)))
    }

    /// The cached catalog, loading the persisted copy on first use
    pub fn get_cached_index(&self) -> Option<MarketplaceIndex> {
        let mut cached = lock(&self.cached);
        if cached.is_none() {
            match read_json::<MarketplaceIndex>(&self.cache_file) {
                Ok(Some(index)) => {
                    tracing::debug!("Loaded marketplace index from {}", self.cache_file.display());
                    *cached = Some(index);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Ignoring unreadable index cache: {}", e),
            }
        }
        cached.clone()
    }

    /// Replace the cached catalog and persist it
    ///
    /// The in-memory copy is replaced even when writing the file fails.
    pub fn update_index_cache(&self, index: MarketplaceIndex) -> Result<(), HostError> {
        let mut cached = lock(&self.cached);
        let result = write_json_atomic(&self.cache_file, &index);
        *cached = Some(index);
        result
    }

    /// Look up a plugin in the cached catalog
    pub fn find_plugin(&self, plugin_id: &str) -> Option<PluginInfo> {
        self.get_cached_index()
            .and_then(|index| index.find_plugin(plugin_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> MarketplaceIndex {
        serde_json::from_value(serde_json::json!({
            "version": "1",
            "plugins": [{
                "id": "clock",
                "name": "Clock",
                "description": "Clock faces",
                "version": "1.2.0",
                "author": "lumen"
            }]
        }))
        .unwrap()
    }

    fn cache_in(dir: &std::path::Path) -> IndexCache {
        IndexCache::new(
            dir.join("index.json"),
            DEFAULT_INDEX_URL,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_cache_has_no_index() {
        let dir = tempfile::tempdir().unwrap();
        assert!(cache_in(dir.path()).get_cached_index().is_none());
    }

    #[test]
    fn test_update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        cache_in(dir.path()).update_index_cache(sample_index()).unwrap();

        // A fresh cache picks up the persisted copy
        let cache = cache_in(dir.path());
        let index = cache.get_cached_index().unwrap();
        assert_eq!(index, sample_index());
        assert_eq!(cache.find_plugin("clock").unwrap().version, "1.2.0");
        assert!(cache.find_plugin("weather").is_none());
    }

    #[test]
    fn test_user_agent_names_crate() {
        assert!(user_agent().starts_with("lumen-marketplace/"));
    }
}

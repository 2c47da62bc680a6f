//! Configuration management
//!
//! This module handles loading, validation, and management of the Lumen
//! configuration. Configuration is stored in TOML format at
//! ~/.lumen/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: log level
//! - **plugins**: plugin directory
//! - **marketplace**: catalog URL, network timeouts and host version
//!
//! # Plugin Directory
//!
//! The plugin directory is resolved in this order:
//! 1. the `PLUGIN_DIR` environment variable
//! 2. `plugins.dir` in the config file
//! 3. `plugins/` next to the executable
//!
//! # Examples
//!
//! ```no_run
//! use lumen_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Plugins: {:?}", config.plugin_dir());
//! # Ok(())
//! # }
//! ```

use crate::platform::{default_plugin_dir, PLUGIN_DIR_ENV};
use lumen_marketplace::{MarketplaceOptions, DEFAULT_INDEX_URL};
use sdk::errors::HostError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Plugin loading
    #[serde(default)]
    pub plugins: PluginsConfig,

    /// Marketplace client
    #[serde(default)]
    pub marketplace: MarketplaceConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Plugin loading configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// Plugin directory (supports ~ expansion); defaults to `plugins/` next
    /// to the executable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Marketplace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    /// Catalog URL
    #[serde(default = "default_index_url")]
    pub index_url: String,

    /// Timeout for catalog requests
    #[serde(default = "default_metadata_timeout_secs")]
    pub metadata_timeout_secs: u64,

    /// Timeout for binary downloads
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Host version compared with a plugin's minimum host version; plugins
    /// are not checked when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_version: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_index_url() -> String {
    DEFAULT_INDEX_URL.to_string()
}

fn default_metadata_timeout_secs() -> u64 {
    30
}

fn default_download_timeout_secs() -> u64 {
    300
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            index_url: default_index_url(),
            metadata_timeout_secs: default_metadata_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            host_version: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.lumen/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written, TOML parsing
    /// fails, or validation fails.
    pub fn load_or_create() -> Result<Self, HostError> {
        let config_path = Self::default_config_path()?;
        Self::load_or_create_at(&config_path)
    }

    /// Like [`load_or_create`](Self::load_or_create) for an explicit path
    pub fn load_or_create_at(path: &Path) -> Result<Self, HostError> {
        if path.exists() {
            Self::load_from_path(path)
        } else {
            Self::create_default(path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, HostError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| HostError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&contents)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> Result<Self, HostError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| HostError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;
        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, HostError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                HostError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| HostError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| HostError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Created default configuration at {}", path.display());
        Ok(config)
    }

    /// Get the default configuration file path (~/.lumen/config.toml)
    pub fn default_config_path() -> Result<PathBuf, HostError> {
        let home = dirs::home_dir()
            .ok_or_else(|| HostError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".lumen").join("config.toml"))
    }

    fn validate_and_process(&mut self) -> Result<(), HostError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(HostError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if !self.marketplace.index_url.starts_with("http://")
            && !self.marketplace.index_url.starts_with("https://")
        {
            return Err(HostError::Config(format!(
                "marketplace.index_url must be an http(s) URL, got '{}'",
                self.marketplace.index_url
            )));
        }

        if self.marketplace.metadata_timeout_secs == 0
            || self.marketplace.download_timeout_secs == 0
        {
            return Err(HostError::Config(
                "marketplace timeouts must be greater than zero".to_string(),
            ));
        }

        if let Some(dir) = &self.plugins.dir {
            self.plugins.dir = Some(expand_path(dir)?);
        }

        Ok(())
    }

    /// Resolve the plugin directory: `PLUGIN_DIR`, then config, then the
    /// executable's `plugins/` directory
    pub fn plugin_dir(&self) -> PathBuf {
        let from_env = std::env::var_os(PLUGIN_DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        resolve_plugin_dir(from_env, self.plugins.dir.clone())
    }

    /// Marketplace client settings for `plugin_dir`
    pub fn marketplace_options(&self, plugin_dir: &Path) -> MarketplaceOptions {
        let mut options = MarketplaceOptions::new(plugin_dir);
        options.index_url = self.marketplace.index_url.clone();
        options.metadata_timeout = Duration::from_secs(self.marketplace.metadata_timeout_secs);
        options.download_timeout = Duration::from_secs(self.marketplace.download_timeout_secs);
        options.host_version = self.marketplace.host_version.clone();
        options
    }
}

fn resolve_plugin_dir(from_env: Option<PathBuf>, from_config: Option<PathBuf>) -> PathBuf {
    from_env
        .or(from_config)
        .unwrap_or_else(default_plugin_dir)
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, HostError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| HostError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| HostError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| HostError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.marketplace.index_url, DEFAULT_INDEX_URL);
        assert_eq!(config.marketplace.metadata_timeout_secs, 30);
        assert_eq!(config.marketplace.download_timeout_secs, 300);
        assert!(config.plugins.dir.is_none());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.core.log_level, "info");
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let err = Config::from_toml("[core]\nlog_level = \"loud\"\n").unwrap_err();
        assert!(matches!(err, HostError::Config(_)));
    }

    #[test]
    fn test_invalid_index_url_rejected() {
        let err = Config::from_toml("[marketplace]\nindex_url = \"ftp://x\"\n").unwrap_err();
        assert!(err.to_string().contains("index_url"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(Config::from_toml("[marketplace]\nmetadata_timeout_secs = 0\n").is_err());
    }

    #[test]
    fn test_plugin_dir_precedence() {
        let env = Some(PathBuf::from("/env/plugins"));
        let config = Some(PathBuf::from("/config/plugins"));

        assert_eq!(resolve_plugin_dir(env, config.clone()), PathBuf::from("/env/plugins"));
        assert_eq!(resolve_plugin_dir(None, config), PathBuf::from("/config/plugins"));
        assert_eq!(resolve_plugin_dir(None, None), default_plugin_dir());
    }

    #[test]
    fn test_plugin_dir_tilde_is_expanded() {
        let config = Config::from_toml("[plugins]\ndir = \"~/lumen-plugins\"\n").unwrap();
        let home = dirs::home_dir().unwrap();
        assert_eq!(config.plugins.dir, Some(home.join("lumen-plugins")));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        assert_eq!(expand_path(&path).unwrap(), path);
    }

    #[test]
    fn test_marketplace_options_follow_config() {
        let config = Config::from_toml(
            "[marketplace]\nindex_url = \"https://example.org/index.json\"\nmetadata_timeout_secs = 5\n",
        )
        .unwrap();
        let options = config.marketplace_options(Path::new("/plugins"));

        assert_eq!(options.index_url, "https://example.org/index.json");
        assert_eq!(options.metadata_timeout, Duration::from_secs(5));
        assert_eq!(options.download_timeout, Duration::from_secs(300));
        assert_eq!(options.plugin_dir, PathBuf::from("/plugins"));
        assert_eq!(options.host_version, None);
    }

    #[test]
    fn test_host_version_reaches_marketplace_options() {
        let config = Config::from_toml("[marketplace]\nhost_version = \"2.3.0\"\n").unwrap();
        let options = config.marketplace_options(Path::new("/plugins"));
        assert_eq!(options.host_version.as_deref(), Some("2.3.0"));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.marketplace.index_url, deserialized.marketplace.index_url);
    }
}

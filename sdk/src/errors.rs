//! Error types and handling
//!
//! This module provides the error type shared by the plugin host, the
//! marketplace client and plugin modules. Every variant carries enough
//! context (plugin id, path, expected-vs-actual digest, HTTP status) for a
//! caller to act on it.
//!
//! All errors implement the `HostErrorExt` trait which provides user-friendly
//! hints and indicates whether the failed operation can be retried.

use std::path::PathBuf;
use thiserror::Error;

/// Trait for host error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information.
pub trait HostErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is a static string that is safe to show in a UI and never
    /// contains paths, URLs or digests.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried as-is (network hiccups, an install
    /// already running). Non-recoverable errors need a different input or a
    /// fixed plugin binary.
    fn is_recoverable(&self) -> bool;
}

/// Main host error type
///
/// # Error Categories
///
/// - **Loader**: discovery, library loading, symbol resolution, construction
/// - **Marketplace**: network, integrity, persistence, compatibility
/// - **Lookup**: unknown plugin ids, release versions, unloaded plugins
/// - **Concurrency**: an installation is already in flight
///
/// # Examples
///
/// ```
/// use sdk::errors::{HostError, HostErrorExt};
///
/// let error = HostError::PluginNotFound("weather".to_string());
/// assert!(error.is_not_found());
/// assert!(!error.user_hint().is_empty());
///
/// let busy = HostError::InstallInProgress("clock".to_string());
/// assert!(busy.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum HostError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Loader errors
    #[error("Plugin discovery failed for {path:?}: {reason}")]
    Discovery { path: PathBuf, reason: String },

    #[error("Library load failed for {path:?}: {reason}")]
    LibraryLoadFailed { path: PathBuf, reason: String },

    #[error("Symbol '{symbol}' not found in {path:?}")]
    SymbolNotFound { path: PathBuf, symbol: String },

    #[error("Plugin construction failed for {path:?}: {reason}")]
    Construct { path: PathBuf, reason: String },

    // Marketplace errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Hash mismatch for {path:?}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Plugin {plugin_id} requires host version {required}, running {actual}")]
    Incompatible {
        plugin_id: String,
        required: String,
        actual: String,
    },

    #[error("Installation of {0} was cancelled")]
    Cancelled(String),

    // Lookup errors
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    #[error("Release {version} not found for plugin {plugin_id}")]
    ReleaseNotFound { plugin_id: String, version: String },

    #[error("Plugin not loaded: {0}")]
    PluginNotLoaded(String),

    #[error("No marketplace index available")]
    IndexUnavailable,

    // Concurrency errors
    #[error("Another installation is in progress ({0})")]
    InstallInProgress(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HostError {
    /// Whether this error means "the thing you asked for does not exist"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PluginNotFound(_)
                | Self::ReleaseNotFound { .. }
                | Self::PluginNotLoaded(_)
                | Self::IndexUnavailable
        )
    }

    /// Whether this error was raised while turning a file into a live plugin
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::Discovery { .. }
                | Self::LibraryLoadFailed { .. }
                | Self::SymbolNotFound { .. }
                | Self::Construct { .. }
        )
    }
}

impl HostErrorExt for HostError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",

            // Loader errors
            Self::Discovery { .. } => "Plugin directory is missing or unreadable. Check PLUGIN_DIR",
            Self::LibraryLoadFailed { .. } => "Plugin binary could not be opened. Reinstall it",
            Self::SymbolNotFound { .. } => "Plugin binary is incompatible with this host",
            Self::Construct { .. } => "Plugin failed to start. Check plugin logs",

            // Marketplace errors
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::HttpStatus { .. } => "Marketplace server rejected the request. Try again later",
            Self::HashMismatch { .. } => "Downloaded file is corrupted or was tampered with",
            Self::Persistence(_) => "Could not save plugin state to disk. Check permissions",
            Self::Incompatible { .. } => "Plugin needs a newer host. Update the host first",
            Self::Cancelled(_) => "Installation was cancelled",

            // Lookup errors
            Self::PluginNotFound(_) => "Plugin is not known. Refresh the marketplace index",
            Self::ReleaseNotFound { .. } => "This version is not available for the plugin",
            Self::PluginNotLoaded(_) => "Plugin is not loaded",
            Self::IndexUnavailable => "Refresh the marketplace index first",

            Self::InstallInProgress(_) => "Wait for the current installation to finish",

            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Fixing these needs a different binary or a newer host
            Self::LibraryLoadFailed { .. }
            | Self::SymbolNotFound { .. }
            | Self::Construct { .. }
            | Self::HashMismatch { .. }
            | Self::Incompatible { .. } => false,

            _ => true,
        }
    }
}

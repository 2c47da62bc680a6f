//! Marketplace catalog and installation state types
//!
//! These types mirror the catalog document published by the marketplace and
//! the `installed.json` file kept next to the plugins. Field names are the
//! wire names; optional fields are omitted when absent.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// A scene declared by a catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub name: String,
    pub description: String,
}

/// One downloadable artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryInfo {
    pub url: String,
    /// Hex encoded SHA-512 digest of the file
    pub sha512: String,
    /// Size in bytes as published; used when the server sends no length
    pub size: u64,
}

/// Build flavor of a release binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildFlavor {
    /// Headless build loaded by the device host
    Matrix,
    /// Build with the desktop preview enabled
    Desktop,
}

impl BuildFlavor {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildFlavor::Matrix => "matrix",
            BuildFlavor::Desktop => "desktop",
        }
    }
}

impl std::fmt::Display for BuildFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The binaries shipped for one version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<BinaryInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop: Option<BinaryInfo>,
}

impl ReleaseInfo {
    /// Binaries present in this release, matrix first
    pub fn binaries(&self) -> Vec<(BuildFlavor, &BinaryInfo)> {
        let mut binaries = Vec::with_capacity(2);
        if let Some(matrix) = &self.matrix {
            binaries.push((BuildFlavor::Matrix, matrix));
        }
        if let Some(desktop) = &self.desktop {
            binaries.push((BuildFlavor::Desktop, desktop));
        }
        binaries
    }
}

/// Minimum host versions per flavor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop_version: Option<String>,
}

/// A plugin entry in the marketplace catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Latest published version
    pub version: String,
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub scenes: Vec<SceneInfo>,
    /// Version string to release binaries
    #[serde(default)]
    pub releases: HashMap<String, ReleaseInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<CompatibilityInfo>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// The full marketplace catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceIndex {
    /// Catalog schema version
    pub version: String,
    pub plugins: Vec<PluginInfo>,
}

impl MarketplaceIndex {
    /// Find a plugin entry by id
    pub fn find_plugin(&self, plugin_id: &str) -> Option<&PluginInfo> {
        self.plugins.iter().find(|p| p.id == plugin_id)
    }
}

/// A locally installed plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPlugin {
    pub id: String,
    pub version: String,
    pub install_path: String,
    pub enabled: bool,
}

/// Installation state of a plugin, derived from the store and the index
///
/// Serialized as its numeric code, the form front-ends already consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InstallationStatus {
    NotInstalled = 0,
    Installed = 1,
    UpdateAvailable = 2,
    Downloading = 3,
    Installing = 4,
    Error = 5,
}

impl InstallationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InstallationStatus::NotInstalled => "not_installed",
            InstallationStatus::Installed => "installed",
            InstallationStatus::UpdateAvailable => "update_available",
            InstallationStatus::Downloading => "downloading",
            InstallationStatus::Installing => "installing",
            InstallationStatus::Error => "error",
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(InstallationStatus::NotInstalled),
            1 => Some(InstallationStatus::Installed),
            2 => Some(InstallationStatus::UpdateAvailable),
            3 => Some(InstallationStatus::Downloading),
            4 => Some(InstallationStatus::Installing),
            5 => Some(InstallationStatus::Error),
            _ => None,
        }
    }

    /// Whether this status ends an installation
    pub fn is_terminal(self) -> bool {
        matches!(self, InstallationStatus::Installed | InstallationStatus::Error)
    }
}

impl std::fmt::Display for InstallationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for InstallationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for InstallationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| de::Error::custom(format!("unknown installation status {}", code)))
    }
}

/// A progress notification for one installation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationProgress {
    pub plugin_id: String,
    pub status: InstallationStatus,
    /// Fraction complete, 0.0 to 1.0
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

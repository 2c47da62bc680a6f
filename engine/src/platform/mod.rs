//! Platform-specific utilities
//!
//! Module file naming lives in the SDK so plugin authors and the marketplace
//! agree with the loader; it is re-exported here. This module adds the
//! reverse mapping (module path to plugin id) and the default plugin
//! location next to the executable.

use std::path::{Path, PathBuf};

pub use sdk::platform::{library_extension, library_filename, library_prefix};

/// Environment variable overriding the plugin directory
pub const PLUGIN_DIR_ENV: &str = "PLUGIN_DIR";

/// Get the platform name as a string
///
/// Returns one of: "linux", "macos", "windows", "unknown"
///
/// # Examples
///
/// ```
/// use lumen_engine::platform::platform_name;
///
/// let name = platform_name();
/// assert!(["linux", "macos", "windows", "unknown"].contains(&name));
/// ```
pub fn platform_name() -> &'static str {
    #[cfg(target_os = "linux")]
    return "linux";

    #[cfg(target_os = "macos")]
    return "macos";

    #[cfg(target_os = "windows")]
    return "windows";

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    return "unknown";
}

/// Plugin id of a module file: its stem without the library prefix
///
/// # Examples
///
/// ```
/// use lumen_engine::platform::{library_filename, plugin_id_from_path};
/// use std::path::PathBuf;
///
/// let path = PathBuf::from("plugins/weather").join(library_filename("weather"));
/// assert_eq!(plugin_id_from_path(&path).as_deref(), Some("weather"));
/// ```
pub fn plugin_id_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let id = stem.strip_prefix(library_prefix()).unwrap_or(stem);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Directory containing the running executable
pub fn exec_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

/// Plugin directory used when neither `PLUGIN_DIR` nor the config names one
pub fn default_plugin_dir() -> PathBuf {
    exec_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plugins")
}

//! Plugin discovery
//!
//! Each plugin lives in its own directory named after its id and holds one
//! module file named for the platform, e.g. `plugins/clock/libclock.so`.

use crate::platform::library_filename;
use sdk::errors::HostError;
use std::path::{Path, PathBuf};

/// Find module files under `plugin_dir`, sorted by path
///
/// Directories without the expected module file, and hidden directories
/// such as the marketplace cache, are skipped.
pub fn discover(plugin_dir: &Path) -> Result<Vec<PathBuf>, HostError> {
    let entries = std::fs::read_dir(plugin_dir).map_err(|e| HostError::Discovery {
        path: plugin_dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut modules = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry in {}: {}", plugin_dir.display(), e);
                continue;
            }
        };

        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        let Some(plugin_id) = dir.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if plugin_id.starts_with('.') {
            continue;
        }

        let module = dir.join(library_filename(plugin_id));
        if module.is_file() {
            modules.push(module);
        } else {
            tracing::debug!("No module {} in {}, skipping", library_filename(plugin_id), dir.display());
        }
    }

    modules.sort();
    tracing::debug!("Discovered {} plugin modules in {}", modules.len(), plugin_dir.display());
    Ok(modules)
}

//! Small helpers shared by the on-disk caches

use sdk::errors::HostError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, taking over the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Write `value` as pretty JSON, replacing `path` atomically
///
/// The document is written to a sibling temp file first and then renamed
/// over the target, so readers see either the old or the new contents.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), HostError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| HostError::Persistence(format!("{}: {}", parent.display(), e)))?;
    }

    let json = serde_json::to_string_pretty(value)
        .map_err(|e| HostError::Persistence(e.to_string()))?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .map_err(|e| HostError::Persistence(format!("{}: {}", tmp.display(), e)))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        HostError::Persistence(format!("{}: {}", path.display(), e))
    })
}

/// Read a JSON document, `Ok(None)` if the file does not exist
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, HostError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(HostError::Persistence(format!("{}: {}", path.display(), e))),
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| HostError::Persistence(format!("{}: {}", path.display(), e)))
}

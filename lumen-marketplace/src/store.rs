//! Installed-plugin store
//!
//! Keeps one [`InstalledPlugin`] record per id and rewrites `installed.json`
//! after every mutation. Memory is authoritative: if a write fails the error
//! is logged and the next mutation writes the whole list again.

use crate::persist::{lock, read_json, write_json_atomic};
use crate::types::InstalledPlugin;
use sdk::errors::HostError;
use std::path::PathBuf;
use std::sync::Mutex;

pub struct InstalledStore {
    path: PathBuf,
    records: Mutex<Vec<InstalledPlugin>>,
}

impl InstalledStore {
    /// Open the store at `path`, starting empty if the file is missing or
    /// unreadable
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match read_json::<Vec<InstalledPlugin>>(&path) {
            Ok(Some(records)) => {
                tracing::debug!("Loaded {} installed plugin records", records.len());
                dedup_by_id(records)
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Starting with an empty plugin store: {}", e);
                Vec::new()
            }
        };

        Self {
            path,
            records: Mutex::new(records),
        }
    }

    pub fn list(&self) -> Vec<InstalledPlugin> {
        lock(&self.records).clone()
    }

    pub fn get(&self, plugin_id: &str) -> Option<InstalledPlugin> {
        lock(&self.records).iter().find(|r| r.id == plugin_id).cloned()
    }

    /// Insert or replace the record for `record.id` and persist
    pub fn upsert(&self, record: InstalledPlugin) {
        let mut records = lock(&self.records);
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        self.persist(&records);
    }

    /// Remove the record for `plugin_id` and persist
    ///
    /// Nothing is written when the id is unknown.
    pub fn remove(&self, plugin_id: &str) -> Result<InstalledPlugin, HostError> {
        let mut records = lock(&self.records);
        let position = records
            .iter()
            .position(|r| r.id == plugin_id)
            .ok_or_else(|| HostError::PluginNotFound(plugin_id.to_string()))?;
        let removed = records.remove(position);
        self.persist(&records);
        Ok(removed)
    }

    /// Set the enabled flag and persist
    pub fn set_enabled(&self, plugin_id: &str, enabled: bool) -> Result<(), HostError> {
        let mut records = lock(&self.records);
        let record = records
            .iter_mut()
            .find(|r| r.id == plugin_id)
            .ok_or_else(|| HostError::PluginNotFound(plugin_id.to_string()))?;
        record.enabled = enabled;
        self.persist(&records);
        Ok(())
    }

    fn persist(&self, records: &[InstalledPlugin]) {
        if let Err(e) = write_json_atomic(&self.path, records) {
            tracing::error!("Failed to persist installed plugins: {}", e);
        }
    }
}

fn dedup_by_id(records: Vec<InstalledPlugin>) -> Vec<InstalledPlugin> {
    let mut unique: Vec<InstalledPlugin> = Vec::with_capacity(records.len());
    for record in records {
        match unique.iter_mut().find(|r| r.id == record.id) {
            // Later entries win, matching upsert order
            Some(existing) => *existing = record,
            None => unique.push(record),
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, version: &str) -> InstalledPlugin {
        InstalledPlugin {
            id: id.into(),
            version: version.into(),
            install_path: format!("/plugins/{id}"),
            enabled: true,
        }
    }

    #[test]
    fn test_upsert_replaces_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = InstalledStore::open(dir.path().join("installed.json"));

        store.upsert(record("clock", "1.0.0"));
        store.upsert(record("clock", "1.1.0"));

        let records = store.list();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].version, "1.1.0");
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installed.json");

        let store = InstalledStore::open(&path);
        store.upsert(record("clock", "1.0.0"));
        store.upsert(record("weather", "0.3.0"));
        store.set_enabled("weather", false).unwrap();
        drop(store);

        let store = InstalledStore::open(&path);
        assert_eq!(store.list().len(), 2);
        assert!(!store.get("weather").unwrap().enabled);
    }

    #[test]
    fn test_remove_unknown_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installed.json");
        let store = InstalledStore::open(&path);

        let err = store.remove("ghost").unwrap_err();
        assert!(err.is_not_found());
        assert!(!path.exists());
    }

    #[test]
    fn test_garbage_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installed.json");
        std::fs::write(&path, "][").unwrap();

        assert!(InstalledStore::open(&path).list().is_empty());
    }

    #[test]
    fn test_duplicate_ids_on_disk_collapse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installed.json");
        let on_disk = vec![record("clock", "1.0.0"), record("clock", "2.0.0")];
        std::fs::write(&path, serde_json::to_string(&on_disk).unwrap()).unwrap();

        let store = InstalledStore::open(&path);
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.get("clock").unwrap().version, "2.0.0");
    }
}

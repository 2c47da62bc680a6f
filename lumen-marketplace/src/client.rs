//! Installation orchestrator
//!
//! [`MarketplaceClient`] ties the index cache, the installed-plugin store and
//! the installer together. Network and disk work runs on tokio tasks; every
//! async operation returns its `JoinHandle` immediately and reports through
//! optional callbacks as well.
//!
//! Only one installation runs at a time. A second `install` or `update` while
//! one is in flight fails with [`HostError::InstallInProgress`].

use crate::index::{IndexCache, DEFAULT_INDEX_URL};
use crate::installer::{remove_dir_quietly, remove_quietly, Installer};
use crate::persist::lock;
use crate::progress::{CompletionCallback, ProgressCallback, ProgressReporter};
use crate::store::InstalledStore;
use crate::types::{
    BinaryInfo, BuildFlavor, InstallationStatus, InstalledPlugin, MarketplaceIndex, PluginInfo,
};
use sdk::errors::HostError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Name of the directory holding `index.json` and `installed.json`
pub const CACHE_DIR_NAME: &str = ".marketplace_cache";

/// Settings for a [`MarketplaceClient`]
#[derive(Debug, Clone)]
pub struct MarketplaceOptions {
    /// Root directory plugins are installed into
    pub plugin_dir: PathBuf,
    /// Catalog URL used when a fetch names none
    pub index_url: String,
    pub metadata_timeout: Duration,
    pub download_timeout: Duration,
    /// Host version checked against `compatibility.matrix_version`; the
    /// check is skipped when unset
    pub host_version: Option<String>,
}

impl MarketplaceOptions {
    pub fn new(plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
            index_url: DEFAULT_INDEX_URL.to_string(),
            metadata_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(300),
            host_version: None,
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.plugin_dir.join(CACHE_DIR_NAME)
    }
}

#[derive(Debug)]
struct InFlight {
    plugin_id: String,
    status: InstallationStatus,
}

type InFlightCell = Arc<Mutex<Option<InFlight>>>;

/// Holds the single installation slot until dropped
#[derive(Debug)]
struct InstallSlot {
    cell: InFlightCell,
}

impl InstallSlot {
    fn acquire(cell: &InFlightCell, plugin_id: &str) -> Result<Self, HostError> {
        let mut current = lock(cell);
        if let Some(running) = current.as_ref() {
            return Err(HostError::InstallInProgress(running.plugin_id.clone()));
        }
        *current = Some(InFlight {
            plugin_id: plugin_id.to_string(),
            status: InstallationStatus::Installing,
        });
        Ok(Self {
            cell: Arc::clone(cell),
        })
    }

    fn set_status(&self, status: InstallationStatus) {
        if let Some(running) = lock(&self.cell).as_mut() {
            running.status = status;
        }
    }
}

impl Drop for InstallSlot {
    fn drop(&mut self) {
        *lock(&self.cell) = None;
    }
}

/// Marketplace client: catalog, installs and installed-plugin state
pub struct MarketplaceClient {
    options: MarketplaceOptions,
    index: IndexCache,
    store: InstalledStore,
    installer: Installer,
    in_flight: InFlightCell,
    cancel: AtomicBool,
}

impl MarketplaceClient {
    /// Create a client, creating the cache directory and loading the store
    pub fn new(options: MarketplaceOptions) -> Result<Self, HostError> {
        let cache_dir = options.cache_dir();
        std::fs::create_dir_all(&cache_dir)
            .map_err(|e| HostError::Persistence(format!("{}: {}", cache_dir.display(), e)))?;

        let index = IndexCache::new(
            cache_dir.join("index.json"),
            options.index_url.clone(),
            options.metadata_timeout,
        )?;
        let store = InstalledStore::open(cache_dir.join("installed.json"));
        let installer = Installer::new(&options.plugin_dir, options.download_timeout)?;

        info!(
            "Marketplace client ready: {} ({} installed)",
            options.plugin_dir.display(),
            store.list().len()
        );

        Ok(Self {
            options,
            index,
            store,
            installer,
            in_flight: Arc::new(Mutex::new(None)),
            cancel: AtomicBool::new(false),
        })
    }

    pub fn options(&self) -> &MarketplaceOptions {
        &self.options
    }

    /// Fetch the catalog on a background task
    pub fn fetch_index(self: &Arc<Self>, url: Option<String>) -> JoinHandle<Option<MarketplaceIndex>> {
        let client = Arc::clone(self);
        tokio::spawn(async move { client.index.fetch_index(url.as_deref()).await })
    }

    pub fn get_cached_index(&self) -> Option<MarketplaceIndex> {
        self.index.get_cached_index()
    }

    pub fn find_plugin(&self, plugin_id: &str) -> Option<PluginInfo> {
        self.index.find_plugin(plugin_id)
    }

    pub fn get_installed_plugins(&self) -> Vec<InstalledPlugin> {
        self.store.list()
    }

    /// Install `version` of `plugin`
    ///
    /// Progress starts at 0.0 and ends with exactly one `Installed` or `Error`
    /// update. The completion callback runs after the terminal progress
    /// update.
    pub fn install(
        self: &Arc<Self>,
        plugin: PluginInfo,
        version: String,
        progress: Option<ProgressCallback>,
        completion: Option<CompletionCallback>,
    ) -> JoinHandle<Result<InstalledPlugin, HostError>> {
        let client = Arc::clone(self);
        let slot = self.acquire_slot(&plugin.id);

        tokio::spawn(async move {
            let mut reporter = ProgressReporter::new(&plugin.id, progress);
            let result = match slot {
                Ok(slot) => client.run_install(&slot, &plugin, &version, &mut reporter).await,
                Err(e) => Err(e),
            };
            finish(&mut reporter, completion, &result);
            result
        })
    }

    /// Remove an installed plugin's record and files
    pub fn uninstall(
        self: &Arc<Self>,
        plugin_id: String,
        completion: Option<CompletionCallback>,
    ) -> JoinHandle<Result<(), HostError>> {
        let client = Arc::clone(self);

        tokio::spawn(async move {
            let result = if client.installing(&plugin_id) {
                Err(HostError::InstallInProgress(plugin_id.clone()))
            } else {
                client.run_uninstall(&plugin_id).await
            };
            if let Some(completion) = completion {
                completion(result.as_ref().map(|_| ()));
            }
            result
        })
    }

    /// Replace an installed plugin with `new_version` from the cached catalog
    pub fn update(
        self: &Arc<Self>,
        plugin_id: String,
        new_version: String,
        progress: Option<ProgressCallback>,
        completion: Option<CompletionCallback>,
    ) -> JoinHandle<Result<InstalledPlugin, HostError>> {
        let client = Arc::clone(self);
        let slot = self.acquire_slot(&plugin_id);

        tokio::spawn(async move {
            let mut reporter = ProgressReporter::new(&plugin_id, progress);
            let result = match slot {
                Ok(slot) => {
                    client
                        .run_update(&slot, &plugin_id, &new_version, &mut reporter)
                        .await
                }
                Err(e) => Err(e),
            };
            finish(&mut reporter, completion, &result);
            result
        })
    }

    pub fn enable_plugin(&self, plugin_id: &str) -> Result<(), HostError> {
        self.store.set_enabled(plugin_id, true)?;
        info!("Enabled plugin {}", plugin_id);
        Ok(())
    }

    pub fn disable_plugin(&self, plugin_id: &str) -> Result<(), HostError> {
        self.store.set_enabled(plugin_id, false)?;
        info!("Disabled plugin {}", plugin_id);
        Ok(())
    }

    /// Derived status of a plugin
    ///
    /// The in-flight installation wins over the store. An installed plugin
    /// whose catalog entry has a newer version reports `UpdateAvailable`.
    pub fn get_plugin_status(&self, plugin_id: &str) -> InstallationStatus {
        if let Some(running) = lock(&self.in_flight).as_ref() {
            if running.plugin_id == plugin_id {
                return running.status;
            }
        }

        let Some(record) = self.store.get(plugin_id) else {
            return InstallationStatus::NotInstalled;
        };

        match self.index.find_plugin(plugin_id) {
            Some(latest) if is_newer(&latest.version, &record.version) => {
                InstallationStatus::UpdateAvailable
            }
            _ => InstallationStatus::Installed,
        }
    }

    /// Check the plugin's minimum host version against this host
    ///
    /// Passes when no host version is configured.
    pub fn check_compatibility(&self, plugin: &PluginInfo) -> Result<(), HostError> {
        let Some(host) = self.options.host_version.as_deref() else {
            return Ok(());
        };
        let Some(required) = plugin
            .compatibility
            .as_ref()
            .and_then(|c| c.matrix_version.as_deref())
        else {
            return Ok(());
        };

        match (semver::Version::parse(required), semver::Version::parse(host)) {
            (Ok(required_version), Ok(host_version)) if host_version < required_version => {
                Err(HostError::Incompatible {
                    plugin_id: plugin.id.clone(),
                    required: required.to_string(),
                    actual: host.to_string(),
                })
            }
            (Ok(_), Ok(_)) => Ok(()),
            _ => {
                warn!(
                    "Cannot compare versions for {} (requires {}, host {}); allowing",
                    plugin.id, required, host
                );
                Ok(())
            }
        }
    }

    /// Dependencies of a plugin, as declared in the catalog
    pub fn resolve_dependencies(&self, plugin: &PluginInfo) -> Vec<String> {
        plugin.dependencies.clone()
    }

    /// Ask the running installation to stop at the next chunk boundary
    ///
    /// Returns whether an installation was running.
    pub fn cancel_install(&self) -> bool {
        let running = lock(&self.in_flight).is_some();
        if running {
            self.cancel.store(true, Ordering::SeqCst);
            info!("Cancellation requested");
        }
        running
    }

    fn acquire_slot(&self, plugin_id: &str) -> Result<InstallSlot, HostError> {
        let slot = InstallSlot::acquire(&self.in_flight, plugin_id)?;
        self.cancel.store(false, Ordering::SeqCst);
        Ok(slot)
    }

    fn installing(&self, plugin_id: &str) -> bool {
        lock(&self.in_flight)
            .as_ref()
            .map(|running| running.plugin_id == plugin_id)
            .unwrap_or(false)
    }

    async fn run_install(
        &self,
        slot: &InstallSlot,
        plugin: &PluginInfo,
        version: &str,
        reporter: &mut ProgressReporter,
    ) -> Result<InstalledPlugin, HostError> {
        info!("Installing {} v{}", plugin.id, version);
        step(slot, reporter, InstallationStatus::Installing, 0.0);

        let release = plugin
            .releases
            .get(version)
            .ok_or_else(|| release_not_found(plugin, version))?;
        self.check_compatibility(plugin)?;

        let binaries = release.binaries();
        if binaries.is_empty() {
            return Err(release_not_found(plugin, version));
        }

        let mut created_dirs = Vec::new();
        if let Err(e) = self
            .place_binaries(slot, reporter, &plugin.id, &binaries, &mut created_dirs)
            .await
        {
            for dir in created_dirs.iter().rev() {
                remove_dir_quietly(dir).await;
            }
            warn!("Installation of {} failed: {}", plugin.id, e);
            return Err(e);
        }

        let record = InstalledPlugin {
            id: plugin.id.clone(),
            version: version.to_string(),
            install_path: self.installer.install_path(&plugin.id).display().to_string(),
            enabled: true,
        };
        self.store.upsert(record.clone());

        info!("Installed {} v{}", plugin.id, version);
        Ok(record)
    }

    /// Download and verify every binary, then move them all into place
    async fn place_binaries(
        &self,
        slot: &InstallSlot,
        reporter: &mut ProgressReporter,
        plugin_id: &str,
        binaries: &[(BuildFlavor, &BinaryInfo)],
        created_dirs: &mut Vec<PathBuf>,
    ) -> Result<(), HostError> {
        let mut verified = Vec::with_capacity(binaries.len());

        for (position, (flavor, binary)) in binaries.iter().enumerate() {
            let (start, end) = progress_band(position, binaries.len());
            step(slot, reporter, InstallationStatus::Installing, start);

            let target = self.installer.binary_target(plugin_id, *flavor);
            if let Some(parent) = target.parent() {
                if let Some(created) = self.installer.ensure_dir(parent).await? {
                    created_dirs.push(created);
                }
            }

            slot.set_status(InstallationStatus::Downloading);
            let fetched = self
                .installer
                .fetch_binary(plugin_id, binary, &target, &self.cancel, |fraction| {
                    reporter.report(
                        InstallationStatus::Downloading,
                        start + (end - start) * fraction,
                    )
                })
                .await;

            match fetched {
                Ok(part) => {
                    debug!("Verified {} build of {}", flavor, plugin_id);
                    verified.push((part, target));
                }
                Err(e) => {
                    for (part, _) in &verified {
                        remove_quietly(part).await;
                    }
                    return Err(e);
                }
            }
        }

        step(slot, reporter, InstallationStatus::Installing, 0.95);
        for (part, target) in &verified {
            self.installer.commit(part, target).await?;
        }
        Ok(())
    }

    async fn run_uninstall(&self, plugin_id: &str) -> Result<(), HostError> {
        let record = self.store.remove(plugin_id)?;
        self.installer.remove_install_dir(plugin_id).await;
        info!("Uninstalled {} v{}", record.id, record.version);
        Ok(())
    }

    async fn run_update(
        &self,
        slot: &InstallSlot,
        plugin_id: &str,
        new_version: &str,
        reporter: &mut ProgressReporter,
    ) -> Result<InstalledPlugin, HostError> {
        let index = self
            .index
            .get_cached_index()
            .ok_or(HostError::IndexUnavailable)?;
        let plugin = index
            .find_plugin(plugin_id)
            .cloned()
            .ok_or_else(|| HostError::PluginNotFound(plugin_id.to_string()))?;

        // Validate before anything is removed
        if !plugin.releases.contains_key(new_version) {
            return Err(release_not_found(&plugin, new_version));
        }
        self.check_compatibility(&plugin)?;

        info!("Updating {} to v{}", plugin_id, new_version);
        self.run_uninstall(plugin_id).await?;
        self.run_install(slot, &plugin, new_version, reporter).await
    }
}

fn step(slot: &InstallSlot, reporter: &mut ProgressReporter, status: InstallationStatus, fraction: f64) {
    slot.set_status(status);
    reporter.report(status, fraction);
}

fn finish<T>(
    reporter: &mut ProgressReporter,
    completion: Option<CompletionCallback>,
    result: &Result<T, HostError>,
) {
    match result {
        Ok(_) => reporter.finish(),
        Err(e) => reporter.fail(e),
    }
    if let Some(completion) = completion {
        completion(result.as_ref().map(|_| ()));
    }
}

fn release_not_found(plugin: &PluginInfo, version: &str) -> HostError {
    HostError::ReleaseNotFound {
        plugin_id: plugin.id.clone(),
        version: version.to_string(),
    }
}

/// Progress range covered by the download of binary `position` of `count`
///
/// The first binary starts at 0.25 and the last of several at 0.75.
fn progress_band(position: usize, count: usize) -> (f64, f64) {
    let start = if position == 0 { 0.25 } else { 0.75 };
    let end = if position + 1 < count { 0.75 } else { 0.95 };
    (start, end)
}

/// Whether `latest` is newer than `installed`
///
/// Falls back to plain inequality when either side is not semver.
pub fn is_newer(latest: &str, installed: &str) -> bool {
    match (semver::Version::parse(latest), semver::Version::parse(installed)) {
        (Ok(latest), Ok(installed)) => latest > installed,
        _ => latest != installed,
    }
}

//! Plugin registry
//!
//! The registry owns every loaded plugin. It discovers module files, loads
//! them through a [`ModuleLoader`], and serves the aggregated scene and
//! image provider lists to the renderer.
//!
//! All state sits behind one mutex; modules are opened and closed only while
//! it is held. Aggregated lists are cached and the cache is dropped by every
//! load, unload and shutdown.
//!
//! # Scene lifetime
//!
//! Scenes and image providers are returned as [`SceneRef`] and
//! [`ImageProviderRef`], which keep their module mapped. Unloading a plugin
//! stops and destroys it right away; its module closes once the last
//! reference handed out for it is dropped.
//!
//! Calls into plugin code made here are guarded: a plugin that panics while
//! listing its scenes or describing itself is logged and left out.

use super::discovery::discover;
use super::handle::{ImageProviderRef, LoadedPluginHandle, SceneRef};
use super::module::ModuleLoader;
use super::native::LibloadingLoader;
use crate::platform::plugin_id_from_path;
use sdk::errors::HostError;
use sdk::ScenePlugin;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/// Read-only description of a loaded plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginSummary {
    pub id: String,
    pub name: String,
    pub version: String,
    pub location: PathBuf,
    pub scenes: Vec<String>,
}

/// Outcome of loading a plugin directory
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Ids loaded by this call
    pub loaded: Vec<String>,
    /// Modules that failed to load, with the reason
    pub skipped: Vec<(PathBuf, HostError)>,
}

#[derive(Default)]
struct RegistryState {
    initialized: bool,
    plugins: Vec<LoadedPluginHandle>,
    scenes: Option<Vec<SceneRef>>,
    image_providers: Option<Vec<ImageProviderRef>>,
}

impl RegistryState {
    fn invalidate(&mut self) {
        self.scenes = None;
        self.image_providers = None;
    }

    fn position(&self, plugin_id: &str) -> Option<usize> {
        self.plugins.iter().position(|p| p.id() == plugin_id)
    }
}

pub struct PluginRegistry {
    loader: Box<dyn ModuleLoader>,
    state: Mutex<RegistryState>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    /// Registry backed by `libloading`
    pub fn new() -> Self {
        Self::with_loader(Box::new(LibloadingLoader))
    }

    pub fn with_loader(loader: Box<dyn ModuleLoader>) -> Self {
        Self {
            loader,
            state: Mutex::new(RegistryState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Discover and load every plugin in `plugin_dir`
    ///
    /// Runs once; later calls return an empty report until
    /// [`destroy_plugins`](Self::destroy_plugins) resets the registry.
    /// Modules that fail to load are logged and listed in the report.
    pub fn initialize(&self, plugin_dir: &Path) -> Result<LoadReport, HostError> {
        let mut state = self.lock();
        if state.initialized {
            debug!("Plugin registry already initialized");
            return Ok(LoadReport::default());
        }

        info!("Loading plugins from {}", plugin_dir.display());
        let modules = discover(plugin_dir)?;

        let mut report = LoadReport::default();
        for path in modules {
            match self.load_locked(&mut state, &path) {
                Ok(Some(id)) => report.loaded.push(id),
                Ok(None) => {}
                Err(e) => {
                    warn!("Skipping plugin {}: {}", path.display(), e);
                    report.skipped.push((path, e));
                }
            }
        }

        state.initialized = true;
        state.invalidate();
        info!(
            "Loaded {} plugins ({} skipped)",
            report.loaded.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Load one module file
    ///
    /// Loading an id that is already loaded logs a warning and succeeds
    /// without touching the module. Returns the plugin id.
    pub fn load_plugin(&self, path: &Path) -> Result<String, HostError> {
        let mut state = self.lock();
        let result = self.load_locked(&mut state, path);
        state.invalidate();

        match result {
            Ok(Some(id)) => Ok(id),
            Ok(None) => plugin_id_from_path(path).ok_or_else(|| unnamed(path)),
            Err(e) => {
                warn!("Failed to load plugin {}: {}", path.display(), e);
                Err(e)
            }
        }
    }

    /// `Ok(None)` when the id is already loaded
    fn load_locked(
        &self,
        state: &mut RegistryState,
        path: &Path,
    ) -> Result<Option<String>, HostError> {
        let id = plugin_id_from_path(path).ok_or_else(|| unnamed(path))?;
        if state.position(&id).is_some() {
            warn!("Plugin {} is already loaded, ignoring {}", id, path.display());
            return Ok(None);
        }

        let module = self.loader.open(path)?;
        let handle = LoadedPluginHandle::instantiate(module)?;

        if let Some(plugin) = handle.plugin() {
            info!(
                "Loaded plugin {} ({} v{}) from {}",
                id,
                plugin.name(),
                plugin.version(),
                path.display()
            );
        }
        state.plugins.push(handle);
        Ok(Some(id))
    }

    /// Stop, destroy and close one plugin
    pub fn unload_plugin(&self, plugin_id: &str) -> Result<(), HostError> {
        let mut state = self.lock();
        let position = state
            .position(plugin_id)
            .ok_or_else(|| HostError::PluginNotLoaded(plugin_id.to_string()))?;

        state.invalidate();
        let mut handle = state.plugins.remove(position);
        handle.teardown();

        info!("Unloaded plugin {}", plugin_id);
        Ok(())
    }

    /// Tear down every plugin
    ///
    /// All destructors run, in load order, before any module is closed.
    pub fn destroy_plugins(&self) {
        let mut state = self.lock();
        state.invalidate();
        state.initialized = false;

        let mut plugins = std::mem::take(&mut state.plugins);
        if plugins.is_empty() {
            return;
        }

        info!("Destroying {} plugins", plugins.len());
        for handle in plugins.iter_mut() {
            handle.destroy_instance();
        }
        for handle in plugins.iter_mut() {
            handle.close_module();
        }
    }

    /// Summaries of the loaded plugins, in load order
    pub fn get_plugins(&self) -> Vec<PluginSummary> {
        let state = self.lock();
        state
            .plugins
            .iter()
            .filter_map(|handle| {
                let plugin = handle.plugin()?;
                let summary = catch_unwind(AssertUnwindSafe(|| PluginSummary {
                    id: handle.id().to_string(),
                    name: plugin.name().to_string(),
                    version: plugin.version().to_string(),
                    location: handle.path().to_path_buf(),
                    scenes: plugin.scenes().iter().map(|s| s.name().to_string()).collect(),
                }));
                match summary {
                    Ok(summary) => Some(summary),
                    Err(_) => {
                        error!("Plugin {} panicked while describing itself", handle.id());
                        None
                    }
                }
            })
            .collect()
    }

    /// Scenes of every loaded plugin, in load order
    pub fn get_scenes(&self) -> Vec<SceneRef> {
        let mut state = self.lock();
        if let Some(scenes) = &state.scenes {
            return scenes.clone();
        }

        let scenes: Vec<SceneRef> = state
            .plugins
            .iter()
            .flat_map(LoadedPluginHandle::scenes)
            .collect();
        debug!("Aggregated {} scenes", scenes.len());
        state.scenes = Some(scenes.clone());
        scenes
    }

    /// Image providers of every loaded plugin, in load order
    pub fn get_image_providers(&self) -> Vec<ImageProviderRef> {
        let mut state = self.lock();
        if let Some(providers) = &state.image_providers {
            return providers.clone();
        }

        let providers: Vec<ImageProviderRef> = state
            .plugins
            .iter()
            .flat_map(LoadedPluginHandle::image_providers)
            .collect();
        state.image_providers = Some(providers.clone());
        providers
    }

    /// Run `f` against a loaded plugin while the registry lock is held
    pub fn with_plugin<R>(
        &self,
        plugin_id: &str,
        f: impl FnOnce(&dyn ScenePlugin) -> R,
    ) -> Result<R, HostError> {
        let state = self.lock();
        state
            .plugins
            .iter()
            .find(|handle| handle.id() == plugin_id)
            .and_then(LoadedPluginHandle::plugin)
            .map(f)
            .ok_or_else(|| HostError::PluginNotLoaded(plugin_id.to_string()))
    }

    pub fn is_loaded(&self, plugin_id: &str) -> bool {
        self.lock().position(plugin_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for PluginRegistry {
    fn drop(&mut self) {
        self.destroy_plugins();
    }
}

fn unnamed(path: &Path) -> HostError {
    HostError::Discovery {
        path: path.to_path_buf(),
        reason: "cannot derive a plugin id from the file name".to_string(),
    }
}

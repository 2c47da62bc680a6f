//! Owned handle for one loaded plugin
//!
//! A [`LoadedPluginHandle`] keeps the open module, the resolved destructor
//! and the live instance together. Teardown runs `stop`, then the
//! destructor, then releases the module. Each step runs at most once and the
//! module is never closed while an instance it created is alive.
//!
//! Scenes and image providers are handed out as [`PluginRef`]s. Each one
//! holds a share of the module, so the module is closed only when the handle
//! and every outstanding reference are gone.

use super::module::NativeModule;
use crate::platform::plugin_id_from_path;
use sdk::errors::HostError;
use sdk::{create_symbol, destroy_symbol, DestroyFn, ImageProvider, Scene, ScenePlugin};
use std::fmt;
use std::ops::Deref;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::Arc;

/// Closes its module when dropped
pub struct ModuleGuard {
    module: Option<Box<dyn NativeModule>>,
}

impl ModuleGuard {
    fn new(module: Box<dyn NativeModule>) -> Self {
        Self {
            module: Some(module),
        }
    }
}

impl Drop for ModuleGuard {
    fn drop(&mut self) {
        if let Some(module) = self.module.take() {
            close_logged(module);
        }
    }
}

/// An object created by plugin code, keeping its module mapped
pub struct PluginRef<T: ?Sized> {
    // Declared first: the object drops before the module can close
    inner: Arc<T>,
    module: Arc<ModuleGuard>,
}

/// A scene with its module kept open
pub type SceneRef = PluginRef<dyn Scene>;

/// An image provider with its module kept open
pub type ImageProviderRef = PluginRef<dyn ImageProvider>;

impl<T: ?Sized> Clone for PluginRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            module: Arc::clone(&self.module),
        }
    }
}

impl<T: ?Sized> Deref for PluginRef<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl fmt::Debug for PluginRef<dyn Scene> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SceneRef").field(&self.name()).finish()
    }
}

impl fmt::Debug for PluginRef<dyn ImageProvider> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ImageProviderRef").field(&self.name()).finish()
    }
}

pub struct LoadedPluginHandle {
    id: String,
    path: PathBuf,
    instance: Option<NonNull<dyn ScenePlugin>>,
    started: bool,
    destroy: DestroyFn,
    destroy_symbol: String,
    module: Option<Arc<ModuleGuard>>,
}

// The instance is only reached through the registry lock, and the module
// contract requires plugins to be `Send + Sync`.
unsafe impl Send for LoadedPluginHandle {}

impl LoadedPluginHandle {
    /// Resolve both entry points, construct the instance and start it
    ///
    /// Every failure closes the module before returning. If an instance was
    /// created, its destructor runs first.
    pub fn instantiate(module: Box<dyn NativeModule>) -> Result<Self, HostError> {
        let path = module.path().to_path_buf();
        let Some(id) = plugin_id_from_path(&path) else {
            close_logged(module);
            return Err(HostError::Construct {
                path,
                reason: "cannot derive a plugin id from the file name".to_string(),
            });
        };

        let create_name = create_symbol(&id);
        let destroy_name = destroy_symbol(&id);

        // Both entry points must exist before anything is constructed
        let resolved = module
            .factory(&create_name)
            .and_then(|create| module.destructor(&destroy_name).map(|destroy| (create, destroy)));
        let (create, destroy) = match resolved {
            Ok(entry_points) => entry_points,
            Err(e) => {
                close_logged(module);
                return Err(e);
            }
        };

        let raw = match catch_unwind(|| unsafe { create() }) {
            Ok(raw) => raw,
            Err(_) => {
                close_logged(module);
                return Err(HostError::Construct {
                    path,
                    reason: format!("{} panicked", create_name),
                });
            }
        };
        let Some(instance) = NonNull::new(raw) else {
            close_logged(module);
            return Err(HostError::Construct {
                path,
                reason: format!("{} returned null", create_name),
            });
        };

        let mut handle = Self {
            id,
            path,
            instance: Some(instance),
            started: false,
            destroy,
            destroy_symbol: destroy_name,
            module: Some(Arc::new(ModuleGuard::new(module))),
        };
        handle.start()?;
        Ok(handle)
    }

    fn start(&mut self) -> Result<(), HostError> {
        let outcome = match self.plugin_mut() {
            Some(plugin) => catch_unwind(AssertUnwindSafe(|| plugin.start())),
            None => Ok(Ok(())),
        };

        let failure = match outcome {
            Ok(Ok(())) => {
                self.started = true;
                return Ok(());
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => "start panicked".to_string(),
        };

        // `started` stays false, so teardown skips `stop`
        self.teardown();
        Err(HostError::Construct {
            path: self.path.clone(),
            reason: failure,
        })
    }

    /// Plugin id, derived from the module file name
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Module file this plugin was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The live instance, `None` once destroyed
    pub fn plugin(&self) -> Option<&dyn ScenePlugin> {
        self.instance.map(|instance| unsafe { &*instance.as_ptr() })
    }

    fn plugin_mut(&mut self) -> Option<&mut dyn ScenePlugin> {
        self.instance.map(|instance| unsafe { &mut *instance.as_ptr() })
    }

    /// Scenes of the live instance; empty if the plugin panics
    pub fn scenes(&self) -> Vec<SceneRef> {
        self.share("scenes", |plugin| plugin.scenes())
    }

    /// Image providers of the live instance; empty if the plugin panics
    pub fn image_providers(&self) -> Vec<ImageProviderRef> {
        self.share("image_providers", |plugin| plugin.image_providers())
    }

    fn share<T: ?Sized>(
        &self,
        hook: &str,
        collect: impl FnOnce(&dyn ScenePlugin) -> Vec<Arc<T>>,
    ) -> Vec<PluginRef<T>> {
        let (Some(plugin), Some(module)) = (self.plugin(), self.module.as_ref()) else {
            return Vec::new();
        };

        match catch_unwind(AssertUnwindSafe(|| collect(plugin))) {
            Ok(items) => items
                .into_iter()
                .map(|inner| PluginRef {
                    inner,
                    module: Arc::clone(module),
                })
                .collect(),
            Err(_) => {
                tracing::error!("Plugin {} panicked in {}, skipping it", self.id, hook);
                Vec::new()
            }
        }
    }

    /// Stop the instance and hand it to the module's destructor
    pub fn destroy_instance(&mut self) {
        if self.started {
            self.started = false;
            if let Some(plugin) = self.plugin_mut() {
                match catch_unwind(AssertUnwindSafe(|| plugin.stop())) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!("Plugin {} failed to stop: {}", self.id, e),
                    Err(_) => tracing::error!("Plugin {} panicked while stopping", self.id),
                }
            }
        }

        if let Some(instance) = self.instance.take() {
            let destroy = self.destroy;
            if catch_unwind(AssertUnwindSafe(|| unsafe { destroy(instance.as_ptr()) })).is_err() {
                tracing::error!("{} panicked in {}", self.path.display(), self.destroy_symbol);
            }
        }
    }

    /// Release the module, destroying the instance first if needed
    ///
    /// The module closes now unless scenes or providers from it are still
    /// held; then it closes when the last of them is dropped.
    pub fn close_module(&mut self) {
        if self.instance.is_some() {
            self.destroy_instance();
        }
        if let Some(module) = self.module.take() {
            let outstanding = Arc::strong_count(&module) - 1;
            if outstanding > 0 {
                tracing::debug!(
                    "Module {} stays open for {} outstanding references",
                    self.path.display(),
                    outstanding
                );
            }
        }
    }

    /// Full teardown: stop, destroy, close
    pub fn teardown(&mut self) {
        self.destroy_instance();
        self.close_module();
    }
}

impl Drop for LoadedPluginHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn close_logged(module: Box<dyn NativeModule>) {
    let path = module.path().to_path_buf();
    if let Err(e) = module.close() {
        tracing::warn!("Failed to close {}: {}", path.display(), e);
    }
}

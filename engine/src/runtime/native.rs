//! `libloading` backend for native plugin modules
//!
//! `libloading` wraps `dlopen`/`dlsym`/`dlclose` on Unix and
//! `LoadLibrary`/`GetProcAddress`/`FreeLibrary` on Windows, so one backend
//! covers every platform the host runs on.

use super::module::{ModuleLoader, NativeModule};
use sdk::errors::HostError;
use sdk::{CreateFn, DestroyFn};
use std::path::{Path, PathBuf};

/// Opens modules with `libloading`
#[derive(Debug, Default, Clone, Copy)]
pub struct LibloadingLoader;

impl ModuleLoader for LibloadingLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn NativeModule>, HostError> {
        // Loading runs the library's initialisers. Modules come from the
        // plugin directory, which only the installer writes to.
        let library = unsafe {
            libloading::Library::new(path).map_err(|e| {
                tracing::error!("Failed to load library {}: {}", path.display(), e);
                HostError::LibraryLoadFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            })?
        };

        Ok(Box::new(LibloadingModule {
            path: path.to_path_buf(),
            library,
        }))
    }
}

/// A module opened by [`LibloadingLoader`]
pub struct LibloadingModule {
    path: PathBuf,
    library: libloading::Library,
}

impl LibloadingModule {
    fn symbol<T: Copy>(&self, symbol: &str) -> Result<T, HostError> {
        // The caller names the expected signature; the module contract fixes
        // it for both entry points.
        unsafe {
            self.library
                .get::<T>(symbol.as_bytes())
                .map(|resolved| *resolved)
                .map_err(|e| {
                    tracing::error!(
                        "Symbol '{}' not found in {}: {}",
                        symbol,
                        self.path.display(),
                        e
                    );
                    HostError::SymbolNotFound {
                        path: self.path.clone(),
                        symbol: symbol.to_string(),
                    }
                })
        }
    }
}

impl NativeModule for LibloadingModule {
    fn path(&self) -> &Path {
        &self.path
    }

    fn factory(&self, symbol: &str) -> Result<CreateFn, HostError> {
        self.symbol::<CreateFn>(symbol)
    }

    fn destructor(&self, symbol: &str) -> Result<DestroyFn, HostError> {
        self.symbol::<DestroyFn>(symbol)
    }

    fn close(self: Box<Self>) -> Result<(), HostError> {
        let LibloadingModule { path, library } = *self;
        library.close().map_err(|e| HostError::LibraryLoadFailed {
            path,
            reason: format!("close failed: {}", e),
        })
    }
}

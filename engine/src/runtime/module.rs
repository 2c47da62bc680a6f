//! Dynamic module abstraction
//!
//! The registry talks to shared libraries only through these two traits.
//! [`LibloadingLoader`](super::native::LibloadingLoader) is the production
//! backend; tests plug in their own.

use sdk::errors::HostError;
use sdk::{CreateFn, DestroyFn};
use std::path::Path;

/// Opens module files
pub trait ModuleLoader: Send + Sync {
    /// Open the module at `path`
    ///
    /// Fails with `HostError::LibraryLoadFailed` if the file cannot be
    /// mapped.
    fn open(&self, path: &Path) -> Result<Box<dyn NativeModule>, HostError>;
}

/// An open module
///
/// Entry points returned by [`factory`](Self::factory) and
/// [`destructor`](Self::destructor) are valid until [`close`](Self::close).
pub trait NativeModule: Send + Sync {
    /// File the module was opened from
    fn path(&self) -> &Path;

    /// Resolve a `create<Identifier>` entry point
    fn factory(&self, symbol: &str) -> Result<CreateFn, HostError>;

    /// Resolve a `destroy<Identifier>` entry point
    fn destructor(&self, symbol: &str) -> Result<DestroyFn, HostError>;

    /// Unmap the module
    fn close(self: Box<Self>) -> Result<(), HostError>;
}

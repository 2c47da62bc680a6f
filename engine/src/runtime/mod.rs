//! Runtime for loading and managing native scene plugins
//!
//! - `discovery`: finds module files in the plugin directory
//! - `module`: the dynamic module traits the registry is written against
//! - `native`: the `libloading` implementation of those traits
//! - `handle`: ownership and teardown of one loaded plugin
//! - `registry`: the plugin registry itself

pub mod discovery;
pub mod handle;
pub mod module;
pub mod native;
pub mod registry;

pub use discovery::discover;
pub use handle::{ImageProviderRef, LoadedPluginHandle, ModuleGuard, PluginRef, SceneRef};
pub use module::{ModuleLoader, NativeModule};
pub use native::{LibloadingLoader, LibloadingModule};
pub use registry::{LoadReport, PluginRegistry, PluginSummary};

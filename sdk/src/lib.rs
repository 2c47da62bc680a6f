//! Lumen SDK
//!
//! Shared library providing the plugin traits, entry point signatures and
//! error types used by the Lumen host, the marketplace client and every
//! native scene plugin.

/// Scene plugin trait and module entry points
pub mod plugin;

/// Error types and handling
pub mod errors;

/// Module file naming per platform
pub mod platform;

// Re-export commonly used types
pub use errors::{HostError, HostErrorExt};
pub use plugin::{
    create_symbol, destroy_symbol, plugin_identifier, CreateFn, DestroyFn, ImageProvider, Scene,
    ScenePlugin,
};

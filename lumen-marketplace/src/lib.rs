//! Lumen plugin marketplace
//!
//! This crate fetches the marketplace catalog, downloads and verifies plugin
//! binaries, installs them into the plugin directory and keeps track of
//! what is installed.
//!
//! Start with [`MarketplaceClient`]; the other modules are its building
//! blocks and are public for tooling and tests.

pub mod client;
pub mod index;
pub mod installer;
pub mod progress;
pub mod store;
pub mod types;
pub mod verifier;

mod persist;

pub use client::{MarketplaceClient, MarketplaceOptions, CACHE_DIR_NAME};
pub use index::{IndexCache, DEFAULT_INDEX_URL};
pub use progress::{CompletionCallback, ProgressCallback};
pub use types::{
    BinaryInfo, BuildFlavor, CompatibilityInfo, InstallationProgress, InstallationStatus,
    InstalledPlugin, MarketplaceIndex, PluginInfo, ReleaseInfo, SceneInfo,
};

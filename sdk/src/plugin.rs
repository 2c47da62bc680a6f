//! Scene plugin trait and module entry points
//!
//! This module defines the `ScenePlugin` trait that every native plugin
//! module must implement, the scene and image provider capabilities a plugin
//! hands to the rendering host, and the function signatures of the two
//! entry points the host resolves after opening a module.
//!
//! # Module Contract
//!
//! A module named `libweather.so` (`weather.dll` on Windows) must export:
//!
//! - `createWeather`: takes no arguments, returns a new plugin instance
//! - `destroyWeather`: takes that instance back and frees everything it owns
//!
//! The identifier is the file stem without the platform prefix, with its first
//! letter capitalised. Use [`export_plugin!`](crate::export_plugin) to
//! generate both functions.
//!
//! # Global State
//!
//! A module links its own copy of every crate it depends on, along with that
//! crate's globals. The host's `tracing` subscriber is not installed in the
//! module, so logging from plugin code is silently dropped. Report failures
//! through [`HostError`] instead; the host logs them.
//!
//! Objects a plugin hands out stay valid while the host keeps its module
//! open. The host does that for every scene and image provider it passes on.

use crate::errors::HostError;
use std::sync::Arc;

/// A visual scene the rendering host can display
pub trait Scene: Send + Sync {
    /// Unique scene name within its plugin
    fn name(&self) -> &str;

    /// Short human readable description
    fn description(&self) -> &str {
        ""
    }
}

/// A source of images that scenes can draw from
pub trait ImageProvider: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;
}

/// Trait that all native plugin modules must implement
///
/// Instances are created by the module's `create<Identifier>` entry point and
/// are only ever touched by the host while its registry lock is held.
pub trait ScenePlugin: Send + Sync {
    /// Returns the display name of the plugin
    fn name(&self) -> &str;

    /// Returns the version of the plugin
    fn version(&self) -> &str;

    /// Called once after construction. An error here aborts loading and the
    /// instance is handed back to the destroy entry point.
    fn start(&mut self) -> Result<(), HostError> {
        Ok(())
    }

    /// Called once before the instance is destroyed
    fn stop(&mut self) -> Result<(), HostError> {
        Ok(())
    }

    /// Scenes contributed by this plugin
    fn scenes(&self) -> Vec<Arc<dyn Scene>>;

    /// Image providers contributed by this plugin
    fn image_providers(&self) -> Vec<Arc<dyn ImageProvider>> {
        Vec::new()
    }
}

/// Signature of the `create<Identifier>` entry point
///
/// Returns null if the plugin could not be constructed. Panics unwind into
/// the host, which catches them.
#[allow(improper_ctypes_definitions)]
pub type CreateFn = unsafe extern "C-unwind" fn() -> *mut dyn ScenePlugin;

/// Signature of the `destroy<Identifier>` entry point
#[allow(improper_ctypes_definitions)]
pub type DestroyFn = unsafe extern "C-unwind" fn(*mut dyn ScenePlugin);

/// Identifier used in entry point names: the plugin id with its first letter
/// upper-cased (`weather` becomes `Weather`)
pub fn plugin_identifier(plugin_id: &str) -> String {
    let mut chars = plugin_id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Name of the factory entry point for `plugin_id`
pub fn create_symbol(plugin_id: &str) -> String {
    format!("create{}", plugin_identifier(plugin_id))
}

/// Name of the destructor entry point for `plugin_id`
pub fn destroy_symbol(plugin_id: &str) -> String {
    format!("destroy{}", plugin_identifier(plugin_id))
}

/// Export the create/destroy entry points for a plugin type
///
/// The symbol names must follow the `create<Identifier>` /
/// `destroy<Identifier>` convention for the module's file name.
///
/// ```ignore
/// #[derive(Default)]
/// struct Weather;
///
/// impl sdk::ScenePlugin for Weather { /* ... */ }
///
/// sdk::export_plugin!("createWeather", "destroyWeather", Weather::default);
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($create:literal, $destroy:literal, $constructor:expr) => {
        #[export_name = $create]
        #[allow(improper_ctypes_definitions)]
        pub extern "C-unwind" fn __lumen_plugin_create() -> *mut dyn $crate::ScenePlugin {
            let plugin: Box<dyn $crate::ScenePlugin> = Box::new(($constructor)());
            Box::into_raw(plugin)
        }

        #[export_name = $destroy]
        #[allow(improper_ctypes_definitions)]
        pub unsafe extern "C-unwind" fn __lumen_plugin_destroy(plugin: *mut dyn $crate::ScenePlugin) {
            if !plugin.is_null() {
                drop(Box::from_raw(plugin));
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Clock;

    struct ClockScene;

    impl Scene for ClockScene {
        fn name(&self) -> &str {
            "clock"
        }
    }

    impl ScenePlugin for Clock {
        fn name(&self) -> &str {
            "Clock"
        }

        fn version(&self) -> &str {
            "0.1.0"
        }

        fn scenes(&self) -> Vec<Arc<dyn Scene>> {
            vec![Arc::new(ClockScene)]
        }
    }

    mod exported {
        use super::Clock;
        crate::export_plugin!("createClockTest", "destroyClockTest", || Clock);
    }

    #[test]
    fn test_exported_entry_points_round_trip_instance() {
        let create: CreateFn = exported::__lumen_plugin_create;
        let destroy: DestroyFn = exported::__lumen_plugin_destroy;

        unsafe {
            let raw = create();
            assert!(!raw.is_null());
            assert_eq!((*raw).name(), "Clock");
            assert_eq!((*raw).scenes().len(), 1);
            assert!((*raw).image_providers().is_empty());
            destroy(raw);
        }
    }

    #[test]
    fn test_entry_point_names() {
        assert_eq!(plugin_identifier("weather"), "Weather");
        assert_eq!(plugin_identifier("game-of-life"), "Game-of-life");
        assert_eq!(plugin_identifier(""), "");
        assert_eq!(create_symbol("clock"), "createClock");
        assert_eq!(destroy_symbol("clock"), "destroyClock");
    }

    #[test]
    fn test_default_hooks_succeed() {
        let mut clock = Clock;
        assert!(clock.start().is_ok());
        assert!(clock.stop().is_ok());
        assert_eq!(ClockScene.description(), "");
    }
}

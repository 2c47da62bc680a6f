//! Integration tests for platform-specific module naming
//!
//! These tests verify that plugin directories laid out with the platform's
//! library naming are discovered, and that plugin ids survive the round trip
//! through file names.

use lumen_engine::platform::{
    default_plugin_dir, exec_dir, library_extension, library_filename, library_prefix,
    platform_name, plugin_id_from_path,
};
use lumen_engine::runtime::discover;
use proptest::prelude::*;
use sdk::create_symbol;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_library_naming_matches_platform() {
    if cfg!(target_os = "linux") {
        assert_eq!(library_filename("clock"), "libclock.so");
    } else if cfg!(target_os = "macos") {
        assert_eq!(library_filename("clock"), "libclock.dylib");
    } else if cfg!(windows) {
        assert_eq!(library_filename("clock"), "clock.dll");
    }

    assert_eq!(
        library_filename("clock"),
        format!("{}clock.{}", library_prefix(), library_extension())
    );
}

#[test]
fn test_platform_name_is_known() {
    assert!(["linux", "macos", "windows", "unknown"].contains(&platform_name()));
}

#[test]
fn test_plugin_id_round_trips_through_file_name() {
    let temp = TempDir::new().unwrap();
    for id in ["clock", "game-of-life", "weather_2"] {
        let path = temp.path().join(id).join(library_filename(id));
        assert_eq!(plugin_id_from_path(&path).as_deref(), Some(id));
    }
}

#[test]
fn test_discover_uses_platform_file_names() {
    let temp = TempDir::new().unwrap();

    let clock = temp.path().join("clock");
    fs::create_dir(&clock).unwrap();
    fs::write(clock.join(library_filename("clock")), b"module").unwrap();

    // Wrong extension for this platform
    let other = temp.path().join("other");
    fs::create_dir(&other).unwrap();
    fs::write(other.join("other.bin"), b"module").unwrap();

    let found = discover(temp.path()).unwrap();
    assert_eq!(found, vec![clock.join(library_filename("clock"))]);
}

#[test]
fn test_default_plugin_dir_is_next_to_executable() {
    let dir = default_plugin_dir();
    assert!(dir.ends_with("plugins"));
    if let Some(exec) = exec_dir() {
        assert_eq!(dir, exec.join("plugins"));
    }
}

proptest! {
    #[test]
    fn test_any_plugin_id_survives_module_naming(id in "[a-z][a-z0-9_-]{0,20}") {
        let path = PathBuf::from("plugins").join(&id).join(library_filename(&id));
        prop_assert_eq!(plugin_id_from_path(&path), Some(id.clone()));

        let symbol = create_symbol(&id);
        prop_assert!(symbol.starts_with("create"));
        prop_assert!(symbol["create".len()..].starts_with(|c: char| c.is_ascii_uppercase()));
    }
}

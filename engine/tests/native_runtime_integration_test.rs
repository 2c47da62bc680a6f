//! Integration tests for the `libloading` backend
//!
//! These load the `ambient` plugin built by cargo as a dev-dependency. The
//! module is located next to the test binary; set `LUMEN_AMBIENT_LIB` to
//! point at a different build. When no build is found the tests are skipped.

use lumen_engine::platform::{library_extension, library_filename, library_prefix};
use lumen_engine::runtime::PluginRegistry;
use sdk::errors::HostError;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

fn built_ambient() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("LUMEN_AMBIENT_LIB") {
        return Some(PathBuf::from(path));
    }

    // target/<profile>/deps/<test binary>
    let exe = std::env::current_exe().ok()?;
    let deps = exe.parent()?;
    let profile = deps.parent()?;

    let direct = profile.join(library_filename("ambient"));
    if direct.is_file() {
        return Some(direct);
    }

    let prefix = format!("{}ambient", library_prefix());
    let suffix = format!(".{}", library_extension());
    std::fs::read_dir(deps)
        .ok()?
        .filter_map(Result::ok)
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            name.starts_with(&prefix) && name.ends_with(&suffix)
        })
        .max_by_key(|entry| {
            entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH)
        })
        .map(|entry| entry.path())
}

fn install_as(root: &Path, built: &Path, id: &str) -> PathBuf {
    let dir = root.join(id);
    std::fs::create_dir_all(&dir).unwrap();
    let module = dir.join(library_filename(id));
    std::fs::copy(built, &module).unwrap();
    module
}

#[test]
fn test_real_module_loads_and_renamed_copy_is_rejected() {
    let Some(built) = built_ambient() else {
        eprintln!("ambient module not built, skipping");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let ambient = install_as(dir.path(), &built, "ambient");
    // Same binary under another id: its entry points do not match the name
    install_as(dir.path(), &built, "bogus");

    let registry = PluginRegistry::new();
    let report = registry.initialize(dir.path()).unwrap();

    assert_eq!(report.loaded, vec!["ambient"]);
    assert_eq!(report.skipped.len(), 1);
    match &report.skipped[0].1 {
        HostError::SymbolNotFound { symbol, .. } => assert_eq!(symbol, "createBogus"),
        other => panic!("unexpected skip reason: {other}"),
    }

    let names: Vec<String> = registry
        .get_scenes()
        .iter()
        .map(|s| s.name().to_string())
        .collect();
    assert_eq!(names, vec!["star_field", "metablobs", "fire", "clock"]);

    let plugins = registry.get_plugins();
    assert_eq!(plugins.len(), 1);
    assert_eq!(plugins[0].name, "Ambient Scenes");
    assert_eq!(plugins[0].location, ambient);

    // Loading again keeps the module that is already open
    assert_eq!(registry.load_plugin(&ambient).unwrap(), "ambient");
    assert_eq!(registry.len(), 1);

    registry.destroy_plugins();
    assert!(registry.is_empty());
}

#[test]
fn test_real_module_stays_mapped_while_scenes_are_held() {
    let Some(built) = built_ambient() else {
        eprintln!("ambient module not built, skipping");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    install_as(dir.path(), &built, "ambient");

    let registry = PluginRegistry::new();
    registry.initialize(dir.path()).unwrap();
    let scenes = registry.get_scenes();

    registry.unload_plugin("ambient").unwrap();
    assert_eq!(registry.len(), 0);

    // Both calls dispatch through vtables that live in the module
    assert_eq!(scenes[0].name(), "star_field");
    assert!(!scenes[3].description().is_empty());

    drop(scenes);
}

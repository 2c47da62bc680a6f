use lumen_marketplace::{
    BinaryInfo, CompatibilityInfo, InstallationProgress, InstallationStatus, InstalledPlugin,
    MarketplaceIndex, PluginInfo, ReleaseInfo, SceneInfo,
};
use proptest::prelude::*;
use std::collections::HashMap;

fn status_strategy() -> impl Strategy<Value = InstallationStatus> {
    (0u8..=5).prop_map(|code| InstallationStatus::from_code(code).unwrap())
}

fn binary_strategy() -> impl Strategy<Value = Option<BinaryInfo>> {
    proptest::option::of(("[a-z]{1,10}", "[0-9a-f]{128}", any::<u64>()).prop_map(
        |(name, sha512, size)| BinaryInfo {
            url: format!("https://cdn.example/{name}.so"),
            sha512,
            size,
        },
    ))
}

fn scenes_strategy() -> impl Strategy<Value = Vec<SceneInfo>> {
    proptest::collection::vec(
        ("[a-z_]{1,12}", "[A-Za-z ]{0,24}")
            .prop_map(|(name, description)| SceneInfo { name, description }),
        0..4,
    )
}

fn version_strategy() -> impl Strategy<Value = String> {
    "[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,2}"
}

fn compatibility_strategy() -> impl Strategy<Value = Option<CompatibilityInfo>> {
    proptest::option::of(
        (
            proptest::option::of(version_strategy()),
            proptest::option::of(version_strategy()),
        )
            .prop_map(|(matrix_version, desktop_version)| CompatibilityInfo {
                matrix_version,
                desktop_version,
            }),
    )
}

fn plugin_strategy(id: String) -> impl Strategy<Value = PluginInfo> {
    (
        version_strategy(),
        scenes_strategy(),
        binary_strategy(),
        compatibility_strategy(),
    )
        .prop_map(move |(version, scenes, matrix, compatibility)| {
            let mut releases = HashMap::new();
            releases.insert(version.clone(), ReleaseInfo { matrix, desktop: None });
            PluginInfo {
                id: id.clone(),
                name: id.to_uppercase(),
                description: format!("{id} plugin"),
                version,
                author: "lumen".into(),
                tags: vec![],
                image: None,
                scenes,
                releases,
                compatibility,
                dependencies: vec![],
            }
        })
}

fn index_strategy() -> impl Strategy<Value = MarketplaceIndex> {
    proptest::collection::btree_set("[a-z][a-z0-9-]{0,10}", 0..6)
        .prop_flat_map(|ids| {
            ids.into_iter()
                .map(plugin_strategy)
                .collect::<Vec<_>>()
        })
        .prop_map(|plugins| MarketplaceIndex {
            version: "1".into(),
            plugins,
        })
}

// Catalog entries and store records survive a JSON round trip unchanged,
// including absent optionals.
proptest! {
    #[test]
    fn test_plugin_info_json_round_trip(
        id in "[a-z][a-z0-9-]{0,12}",
        version in version_strategy(),
        tags in proptest::collection::vec("[a-z]{1,8}", 0..4),
        image in proptest::option::of("[a-z]{1,8}\\.png"),
        matrix in binary_strategy(),
        desktop in binary_strategy(),
        scenes in scenes_strategy(),
        compatibility in compatibility_strategy(),
        dependencies in proptest::collection::vec("[a-z]{1,8}", 0..3),
    ) {
        let mut releases = HashMap::new();
        releases.insert(version.clone(), ReleaseInfo { matrix, desktop });

        let info = PluginInfo {
            id: id.clone(),
            name: id.to_uppercase(),
            description: String::new(),
            version,
            author: "lumen".into(),
            tags,
            image,
            scenes,
            releases,
            compatibility,
            dependencies,
        };

        let text = serde_json::to_string(&info).unwrap();
        let back: PluginInfo = serde_json::from_str(&text).unwrap();
        prop_assert_eq!(&back, &info);
        prop_assert_eq!(text.contains("\"compatibility\""), info.compatibility.is_some());
    }

    #[test]
    fn test_index_json_round_trip_keeps_every_entry_findable(index in index_strategy()) {
        let text = serde_json::to_string_pretty(&index).unwrap();
        let back: MarketplaceIndex = serde_json::from_str(&text).unwrap();
        prop_assert_eq!(&back, &index);

        for plugin in &index.plugins {
            prop_assert_eq!(back.find_plugin(&plugin.id), Some(plugin));
        }
        prop_assert!(back.find_plugin("not a plugin id").is_none());
    }

    #[test]
    fn test_installed_records_json_round_trip(
        records in proptest::collection::vec(
            ("[a-z]{1,10}", "[0-9]\\.[0-9]\\.[0-9]", any::<bool>()),
            0..5,
        ),
    ) {
        let records: Vec<InstalledPlugin> = records
            .into_iter()
            .map(|(id, version, enabled)| InstalledPlugin {
                install_path: format!("/plugins/{id}"),
                id,
                version,
                enabled,
            })
            .collect();

        let text = serde_json::to_string_pretty(&records).unwrap();
        let back: Vec<InstalledPlugin> = serde_json::from_str(&text).unwrap();
        prop_assert_eq!(back, records);
    }

    #[test]
    fn test_progress_status_is_numeric(
        status in status_strategy(),
        quarter in 0u8..=4,
    ) {
        let update = InstallationProgress {
            plugin_id: "clock".into(),
            status,
            progress: f64::from(quarter) / 4.0,
            error_message: None,
        };

        let value = serde_json::to_value(&update).unwrap();
        prop_assert_eq!(value["status"].as_u64(), Some(status as u64));
        let back: InstallationProgress = serde_json::from_value(value).unwrap();
        prop_assert_eq!(back, update);
    }
}

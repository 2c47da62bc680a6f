use proptest::prelude::*;
use sdk::errors::{HostError, HostErrorExt};
use std::path::PathBuf;

// Every error variant must produce a non-empty, static hint that never echoes
// caller-supplied data (paths, urls, digests).
proptest! {
    #[test]
    fn test_error_user_hint_completeness(input in "[a-zA-Z0-9/._-]{1,40}") {
        let errs = vec![
            HostError::Config(input.clone()),
            HostError::Discovery { path: PathBuf::from(&input), reason: input.clone() },
            HostError::LibraryLoadFailed { path: PathBuf::from(&input), reason: input.clone() },
            HostError::SymbolNotFound { path: PathBuf::from(&input), symbol: input.clone() },
            HostError::Construct { path: PathBuf::from(&input), reason: input.clone() },
            HostError::Network(input.clone()),
            HostError::HttpStatus { status: 503, url: input.clone() },
            HostError::HashMismatch {
                path: PathBuf::from(&input),
                expected: input.clone(),
                actual: input.clone(),
            },
            HostError::Persistence(input.clone()),
            HostError::PluginNotFound(input.clone()),
            HostError::PluginNotLoaded(input.clone()),
            HostError::InstallInProgress(input.clone()),
            HostError::Cancelled(input.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            if input.len() > 8 {
                prop_assert!(!hint.contains(&input));
            }
        }
    }
}

proptest! {
    #[test]
    fn test_release_not_found_names_plugin_and_version(
        plugin_id in "[a-z][a-z0-9-]{0,15}",
        version in "[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,2}",
    ) {
        let err = HostError::ReleaseNotFound {
            plugin_id: plugin_id.clone(),
            version: version.clone(),
        };
        let message = err.to_string();
        prop_assert!(message.contains(&plugin_id));
        prop_assert!(message.contains(&version));
        prop_assert!(err.is_not_found());
        prop_assert!(err.is_recoverable());
    }
}

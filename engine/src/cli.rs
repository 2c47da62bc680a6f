//! CLI interface for Lumen
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for the plugin registry and the
//! marketplace client.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lumen plugin manager
///
/// Loads native scene plugins and installs them from the plugin marketplace.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the plugin directory
    #[arg(long, global = true, value_name = "DIR")]
    pub plugin_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect plugins in the plugin directory
    Plugins {
        #[command(subcommand)]
        action: PluginAction,
    },

    /// Browse and manage marketplace plugins
    Market {
        #[command(subcommand)]
        action: MarketAction,
    },
}

/// Local plugin actions
#[derive(Subcommand, Debug)]
pub enum PluginAction {
    /// Load every plugin and list them with their scenes
    List,

    /// List the scenes of every loadable plugin
    Scenes,
}

/// Marketplace actions
#[derive(Subcommand, Debug)]
pub enum MarketAction {
    /// Download the plugin catalog
    Refresh {
        /// Catalog URL (defaults to the configured one)
        #[arg(long)]
        url: Option<String>,
    },

    /// List plugins in the cached catalog
    List,

    /// List installed plugins
    Installed,

    /// Show the installation status of a plugin
    Status {
        /// Plugin ID
        id: String,
    },

    /// Install a plugin
    Install {
        /// Plugin ID
        id: String,

        /// Release to install (defaults to the catalog's current version)
        #[arg(long)]
        version: Option<String>,
    },

    /// Remove an installed plugin
    Uninstall {
        /// Plugin ID
        id: String,
    },

    /// Replace an installed plugin with another release
    Update {
        /// Plugin ID
        id: String,

        /// Release to install
        version: String,
    },

    /// Enable an installed plugin
    Enable {
        /// Plugin ID
        id: String,
    },

    /// Disable an installed plugin
    Disable {
        /// Plugin ID
        id: String,
    },

    /// Show the plugins a catalog entry depends on
    Deps {
        /// Plugin ID
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "lumen",
            "market",
            "install",
            "weather",
            "--version",
            "1.2.0",
            "--json",
            "--plugin-dir",
            "/tmp/plugins",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.plugin_dir, Some(PathBuf::from("/tmp/plugins")));
        match cli.command {
            Command::Market {
                action: MarketAction::Install { id, version },
            } => {
                assert_eq!(id, "weather");
                assert_eq!(version.as_deref(), Some("1.2.0"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_update_requires_version() {
        assert!(Cli::try_parse_from(["lumen", "market", "update", "weather"]).is_err());
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        assert!(Cli::try_parse_from(["lumen", "--log", "loud", "plugins", "list"]).is_err());
    }
}

// Lumen plugin manager
// Main entry point for the lumen binary

use clap::Parser;
use lumen_engine::cli::{Cli, Command, MarketAction, PluginAction};
use lumen_engine::config::Config;
use lumen_engine::handlers::{self, OutputFormat};
use lumen_engine::platform::platform_name;
use lumen_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    tracing::debug!("Lumen v{} on {}", env!("CARGO_PKG_VERSION"), platform_name());

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let plugin_dir = cli.plugin_dir.clone().unwrap_or_else(|| config.plugin_dir());
    tracing::debug!("Plugin directory: {}", plugin_dir.display());

    match cli.command {
        Command::Plugins { action } => match action {
            PluginAction::List => handlers::handle_plugins_list(&plugin_dir, format),
            PluginAction::Scenes => handlers::handle_plugins_scenes(&plugin_dir, format),
        },

        Command::Market { action } => {
            let client = handlers::marketplace_client(&config, &plugin_dir)?;
            match action {
                MarketAction::Refresh { url } => {
                    handlers::handle_market_refresh(&client, url, format).await
                }
                MarketAction::List => handlers::handle_market_list(&client, format),
                MarketAction::Installed => handlers::handle_market_installed(&client, format),
                MarketAction::Status { id } => {
                    handlers::handle_market_status(&client, &id, format)
                }
                MarketAction::Install { id, version } => {
                    handlers::handle_market_install(&client, &id, version, format).await
                }
                MarketAction::Uninstall { id } => {
                    handlers::handle_market_uninstall(&client, &id, format).await
                }
                MarketAction::Update { id, version } => {
                    handlers::handle_market_update(&client, &id, version, format).await
                }
                MarketAction::Enable { id } => {
                    handlers::handle_market_set_enabled(&client, &id, true, format)
                }
                MarketAction::Disable { id } => {
                    handlers::handle_market_set_enabled(&client, &id, false, format)
                }
                MarketAction::Deps { id } => handlers::handle_market_deps(&client, &id, format),
            }
        }
    }
}

//! Command handlers for CLI operations
//!
//! - plugins list / scenes: load the plugin directory and report it
//! - market *: drive the marketplace client
//!
//! Results go to stdout, as text or as JSON with `--json`. Logs go to
//! stderr.

use anyhow::{Context, Result};
use lumen_marketplace::{
    InstallationProgress, InstallationStatus, MarketplaceClient, PluginInfo, ProgressCallback,
};
use sdk::errors::{HostError, HostErrorExt};
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::runtime::{LoadReport, PluginRegistry};

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_skipped(report: &LoadReport) {
    for (path, error) in &report.skipped {
        eprintln!("  skipped {}: {}", path.display(), error);
    }
}

/// Load every plugin in `plugin_dir` and list them
pub fn handle_plugins_list(plugin_dir: &Path, format: OutputFormat) -> Result<()> {
    let registry = PluginRegistry::new();
    let report = registry
        .initialize(plugin_dir)
        .context("Failed to load plugins")?;
    let plugins = registry.get_plugins();

    match format {
        OutputFormat::Text => {
            println!("Plugins in {}:", plugin_dir.display());
            println!();
            if plugins.is_empty() {
                println!("  (none)");
            }
            for plugin in &plugins {
                println!("  {} {} v{}", plugin.id, plugin.name, plugin.version);
                println!("    location: {}", plugin.location.display());
                println!("    scenes:   {}", plugin.scenes.join(", "));
            }
            print_skipped(&report);
        }
        OutputFormat::Json => {
            let skipped: Vec<_> = report
                .skipped
                .iter()
                .map(|(path, error)| json!({ "path": path, "error": error.to_string() }))
                .collect();
            print_json(&json!({ "plugins": plugins, "skipped": skipped }))?;
        }
    }

    registry.destroy_plugins();
    Ok(())
}

/// Load every plugin in `plugin_dir` and list the aggregated scenes
pub fn handle_plugins_scenes(plugin_dir: &Path, format: OutputFormat) -> Result<()> {
    let registry = PluginRegistry::new();
    let report = registry
        .initialize(plugin_dir)
        .context("Failed to load plugins")?;

    let scenes = registry.get_scenes();
    match format {
        OutputFormat::Text => {
            println!("Scenes ({}):", scenes.len());
            for scene in &scenes {
                println!("  {}", scene.name());
            }
            print_skipped(&report);
        }
        OutputFormat::Json => {
            let names: Vec<&str> = scenes.iter().map(|scene| scene.name()).collect();
            print_json(&json!({ "scenes": names }))?;
        }
    }

    registry.destroy_plugins();
    Ok(())
}

/// Build the marketplace client for `plugin_dir`
pub fn marketplace_client(config: &Config, plugin_dir: &Path) -> Result<Arc<MarketplaceClient>> {
    let client = MarketplaceClient::new(config.marketplace_options(plugin_dir))
        .context("Failed to open the marketplace cache")?;
    Ok(Arc::new(client))
}

fn cached_plugin(client: &MarketplaceClient, plugin_id: &str) -> Result<PluginInfo> {
    if client.get_cached_index().is_none() {
        return Err(HostError::IndexUnavailable)
            .context("No cached catalog, run `lumen market refresh` first");
    }
    client
        .find_plugin(plugin_id)
        .ok_or_else(|| HostError::PluginNotFound(plugin_id.to_string()))
        .context("Plugin is not in the catalog")
}

/// Download the catalog into the cache
pub async fn handle_market_refresh(
    client: &Arc<MarketplaceClient>,
    url: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let index = client
        .fetch_index(url)
        .await
        .context("Catalog fetch task failed")?;

    let Some(index) = index else {
        let hint = HostError::IndexUnavailable.user_hint().to_string();
        return Err(anyhow::anyhow!("Failed to fetch the plugin catalog. {}", hint));
    };

    match format {
        OutputFormat::Text => {
            println!(
                "Catalog {} refreshed: {} plugins",
                index.version,
                index.plugins.len()
            );
        }
        OutputFormat::Json => {
            print_json(&json!({ "version": index.version, "plugins": index.plugins.len() }))?;
        }
    }
    Ok(())
}

/// List the cached catalog with each plugin's status
pub fn handle_market_list(client: &MarketplaceClient, format: OutputFormat) -> Result<()> {
    let Some(index) = client.get_cached_index() else {
        return Err(HostError::IndexUnavailable)
            .context("No cached catalog, run `lumen market refresh` first");
    };

    match format {
        OutputFormat::Text => {
            println!("Marketplace catalog {}:", index.version);
            println!();
            for plugin in &index.plugins {
                println!(
                    "  {} v{} [{}] by {}",
                    plugin.id,
                    plugin.version,
                    client.get_plugin_status(&plugin.id),
                    plugin.author
                );
                println!("    {}", plugin.description);
            }
        }
        OutputFormat::Json => {
            let plugins: Vec<_> = index
                .plugins
                .iter()
                .map(|plugin| {
                    json!({
                        "id": plugin.id,
                        "name": plugin.name,
                        "version": plugin.version,
                        "author": plugin.author,
                        "tags": plugin.tags,
                        "status": client.get_plugin_status(&plugin.id),
                    })
                })
                .collect();
            print_json(&json!({ "version": index.version, "plugins": plugins }))?;
        }
    }
    Ok(())
}

/// List installed plugins
pub fn handle_market_installed(client: &MarketplaceClient, format: OutputFormat) -> Result<()> {
    let installed = client.get_installed_plugins();

    match format {
        OutputFormat::Text => {
            println!("Installed Plugins:");
            println!();
            if installed.is_empty() {
                println!("  (none)");
            }
            for plugin in &installed {
                println!(
                    "  {} v{}: {}",
                    plugin.id,
                    plugin.version,
                    if plugin.enabled { "enabled" } else { "disabled" }
                );
            }
        }
        OutputFormat::Json => print_json(&json!({ "plugins": installed }))?,
    }
    Ok(())
}

/// Show one plugin's status
pub fn handle_market_status(
    client: &MarketplaceClient,
    plugin_id: &str,
    format: OutputFormat,
) -> Result<()> {
    let status = client.get_plugin_status(plugin_id);

    match format {
        OutputFormat::Text => println!("{}: {}", plugin_id, status),
        OutputFormat::Json => print_json(&json!({
            "id": plugin_id,
            "status": status.as_str(),
            "code": status,
        }))?,
    }
    Ok(())
}

/// Progress printer for text output; prints each whole percent once
fn progress_printer() -> ProgressCallback {
    let last_percent = AtomicI64::new(-1);
    Arc::new(move |progress: &InstallationProgress| {
        let percent = (progress.progress * 100.0).round() as i64;
        if progress.status.is_terminal() || last_percent.swap(percent, Ordering::Relaxed) != percent
        {
            match &progress.error_message {
                Some(message) => eprintln!("  {} {}: {}", progress.plugin_id, progress.status, message),
                None => eprintln!("  {} {} {:>3}%", progress.plugin_id, progress.status, percent),
            }
        }
    })
}

/// Install a catalog plugin; Ctrl-C cancels the download
pub async fn handle_market_install(
    client: &Arc<MarketplaceClient>,
    plugin_id: &str,
    version: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let plugin = cached_plugin(client, plugin_id)?;
    let version = version.unwrap_or_else(|| plugin.version.clone());

    let dependencies = client.resolve_dependencies(&plugin);
    if !dependencies.is_empty() {
        tracing::info!("{} depends on {}", plugin_id, dependencies.join(", "));
    }

    let progress = (format == OutputFormat::Text).then(progress_printer);
    let handle = client.install(plugin, version.clone(), progress, None);
    let record = await_cancellable(client, handle).await??;

    match format {
        OutputFormat::Text => println!("Installed {} v{}", record.id, record.version),
        OutputFormat::Json => print_json(&json!({ "status": "installed", "plugin": record }))?,
    }
    Ok(())
}

/// Replace an installed plugin with `version`; Ctrl-C cancels the download
pub async fn handle_market_update(
    client: &Arc<MarketplaceClient>,
    plugin_id: &str,
    version: String,
    format: OutputFormat,
) -> Result<()> {
    let progress = (format == OutputFormat::Text).then(progress_printer);
    let handle = client.update(plugin_id.to_string(), version, progress, None);
    let record = await_cancellable(client, handle).await??;

    match format {
        OutputFormat::Text => println!("Updated {} to v{}", record.id, record.version),
        OutputFormat::Json => print_json(&json!({ "status": "updated", "plugin": record }))?,
    }
    Ok(())
}

async fn await_cancellable<T>(
    client: &MarketplaceClient,
    mut handle: tokio::task::JoinHandle<T>,
) -> Result<T> {
    tokio::select! {
        result = &mut handle => return result.context("Install task failed"),
        _ = tokio::signal::ctrl_c() => {
            if client.cancel_install() {
                eprintln!("Cancelling...");
            }
        }
    }
    handle.await.context("Install task failed")
}

/// Remove an installed plugin
pub async fn handle_market_uninstall(
    client: &Arc<MarketplaceClient>,
    plugin_id: &str,
    format: OutputFormat,
) -> Result<()> {
    client
        .uninstall(plugin_id.to_string(), None)
        .await
        .context("Uninstall task failed")??;

    match format {
        OutputFormat::Text => println!("Uninstalled {}", plugin_id),
        OutputFormat::Json => print_json(&json!({ "status": "uninstalled", "id": plugin_id }))?,
    }
    Ok(())
}

/// Enable or disable an installed plugin
pub fn handle_market_set_enabled(
    client: &MarketplaceClient,
    plugin_id: &str,
    enabled: bool,
    format: OutputFormat,
) -> Result<()> {
    if enabled {
        client.enable_plugin(plugin_id)?;
    } else {
        client.disable_plugin(plugin_id)?;
    }

    match format {
        OutputFormat::Text => println!(
            "{} {}",
            if enabled { "Enabled" } else { "Disabled" },
            plugin_id
        ),
        OutputFormat::Json => print_json(&json!({ "id": plugin_id, "enabled": enabled }))?,
    }
    Ok(())
}

/// Show a catalog plugin's dependencies and whether each is installed
pub fn handle_market_deps(
    client: &MarketplaceClient,
    plugin_id: &str,
    format: OutputFormat,
) -> Result<()> {
    let plugin = cached_plugin(client, plugin_id)?;
    let dependencies: Vec<(String, InstallationStatus)> = client
        .resolve_dependencies(&plugin)
        .into_iter()
        .map(|id| {
            let status = client.get_plugin_status(&id);
            (id, status)
        })
        .collect();

    match format {
        OutputFormat::Text => {
            if dependencies.is_empty() {
                println!("{} has no dependencies", plugin_id);
            }
            for (id, status) in &dependencies {
                println!("  {} [{}]", id, status);
            }
        }
        OutputFormat::Json => {
            let dependencies: Vec<_> = dependencies
                .iter()
                .map(|(id, status)| json!({ "id": id, "status": status.as_str() }))
                .collect();
            print_json(&json!({ "id": plugin_id, "dependencies": dependencies }))?;
        }
    }
    Ok(())
}

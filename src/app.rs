use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::model::config::{ConfigLoad, TesterConfig};
use crate::plugin::PluginManager;
use crate::server::{ServerExit, ServerLaunch};

/// How a run ended without error.
#[derive(Debug)]
pub enum Outcome {
    /// Default settings were written; the operator edits them and runs again.
    ConfigCreated(PathBuf),
    ServerExited(ServerExit),
}

/// Load settings, swap plugin artifacts, then run the server until it exits.
pub fn run(config_path: &Path) -> Result<Outcome> {
    let config = match TesterConfig::load_or_init(config_path)
        .with_context(|| format!("loading settings from {}", config_path.display()))?
    {
        ConfigLoad::Loaded(config) => config,
        ConfigLoad::Created(path) => return Ok(Outcome::ConfigCreated(path)),
    };
    tracing::info!("loaded settings from {}", config_path.display());

    let launch = ServerLaunch::from_config(&config);
    launch.check().context("checking the server installation")?;

    let manager = PluginManager::new(&config);
    tracing::info!("{}", manager.summary());

    let plan = manager
        .resolve()
        .context("locating plugin artifacts")?;
    let report = plan
        .apply()
        .with_context(|| format!("swapping artifacts in {}", manager.live_dir().display()))?;
    tracing::info!(
        "swap complete: {} removed, {} installed",
        report.removed.len(),
        report.installed.len()
    );

    let exit = launch.run().context("running the server")?;
    Ok(Outcome::ServerExited(exit))
}

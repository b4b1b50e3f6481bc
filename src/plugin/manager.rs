use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::config::TesterConfig;
use crate::model::plugin::{ArtifactFile, PluginSpec};
use crate::plugin::locator::{self, LocateError};
use crate::plugin::swapper::SwapPlan;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Lookup(#[from] LocateError),

    #[error("no built artifact for plugin {plugin} in {}", .dir.display())]
    MissingArtifact { plugin: String, dir: PathBuf },
}

/// The managed plugins of one run, all sharing a live plugins directory.
#[derive(Debug)]
pub struct PluginManager {
    live_dir: PathBuf,
    specs: Vec<PluginSpec>,
}

impl PluginManager {
    pub fn new(config: &TesterConfig) -> Self {
        Self::from_specs(config.plugins_dir(), config.plugin_specs())
    }

    pub fn from_specs(live_dir: PathBuf, specs: Vec<PluginSpec>) -> Self {
        Self { live_dir, specs }
    }

    pub fn plugin_count(&self) -> usize {
        self.specs.len()
    }

    pub fn live_dir(&self) -> &Path {
        &self.live_dir
    }

    /// Locate the old and new artifact of every plugin.
    ///
    /// Read-only: every lookup finishes before anything is changed, so a
    /// missing build leaves the live directory untouched.
    pub fn resolve(&self) -> Result<SwapPlan, ResolveError> {
        let mut plan = SwapPlan::new(self.live_dir.clone());

        for spec in &self.specs {
            let new = locator::locate(&spec.build_dir, &spec.name)?.ok_or_else(|| {
                ResolveError::MissingArtifact {
                    plugin: spec.name.clone(),
                    dir: spec.build_dir.clone(),
                }
            })?;
            let old = Self::installed(spec)?;

            match &old {
                Some(old) => tracing::info!("{}: {} -> {}", spec.name, old, new),
                None => tracing::info!(
                    "{}: first install from {}",
                    spec.name,
                    new.parent().unwrap_or(&spec.build_dir).display()
                ),
            }

            plan.push(&spec.name, old, new);
        }

        Ok(plan)
    }

    pub fn summary(&self) -> String {
        let names: Vec<&str> = self.specs.iter().map(|spec| spec.name.as_str()).collect();
        format!(
            "plugins: {} managed ({}) in {}",
            self.plugin_count(),
            names.join(", "),
            self.live_dir.display()
        )
    }

    /// The artifact currently in the live directory; a live directory that does not exist yet holds none.
    fn installed(spec: &PluginSpec) -> Result<Option<ArtifactFile>, LocateError> {
        match locator::locate(&spec.live_dir, &spec.name) {
            Err(LocateError::MissingDirectory { dir, .. }) => {
                tracing::warn!("plugins directory {} does not exist yet", dir.display());
                Ok(None)
            }
            other => other,
        }
    }
}

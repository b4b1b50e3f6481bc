use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::plugin::ArtifactFile;

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("artifact {} for plugin {plugin} has no file name", .path.display())]
    InvalidArtifact { plugin: String, path: PathBuf },

    #[error("could not remove old artifact of plugin {plugin} at {}: {source}", .path.display())]
    Remove {
        plugin: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not prepare plugins directory {}: {source}", .dir.display())]
    LiveDirectory {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "could not install plugin {plugin} from {} to {}: {source}",
        .from.display(),
        .to.display()
    )]
    Install {
        plugin: String,
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct SwapEntry {
    pub plugin: String,
    pub old: Option<ArtifactFile>,
    pub new: ArtifactFile,
}

/// Old and new artifacts for every managed plugin, ready to be swapped.
#[derive(Debug, Clone)]
pub struct SwapPlan {
    pub live_dir: PathBuf,
    pub entries: Vec<SwapEntry>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SwapReport {
    pub removed: Vec<PathBuf>,
    pub installed: Vec<PathBuf>,
}

impl SwapPlan {
    pub fn new(live_dir: PathBuf) -> Self {
        Self {
            live_dir,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, plugin: impl Into<String>, old: Option<ArtifactFile>, new: ArtifactFile) {
        self.entries.push(SwapEntry {
            plugin: plugin.into(),
            old,
            new,
        });
    }

    /// Where `entry`'s new artifact lands: its own file name, directly under the live directory.
    pub fn install_path(&self, entry: &SwapEntry) -> Result<PathBuf, SwapError> {
        entry
            .new
            .file_name()
            .map(|name| self.live_dir.join(name))
            .ok_or_else(|| SwapError::InvalidArtifact {
                plugin: entry.plugin.clone(),
                path: entry.new.path().to_path_buf(),
            })
    }

    /// Remove every old artifact, then install every new one.
    ///
    /// Nothing is installed if any removal fails. A failed copy stops the
    /// remaining installations; artifacts installed before it stay in place.
    pub fn apply(&self) -> Result<SwapReport, SwapError> {
        let targets = self
            .entries
            .iter()
            .map(|entry| self.install_path(entry))
            .collect::<Result<Vec<_>, _>>()?;

        let mut report = SwapReport::default();

        for entry in &self.entries {
            let Some(old) = entry.old.as_ref() else {
                continue;
            };

            if remove_if_exists(old.path()).map_err(|source| SwapError::Remove {
                plugin: entry.plugin.clone(),
                path: old.path().to_path_buf(),
                source,
            })? {
                tracing::info!("{}: removed {}", entry.plugin, old);
                report.removed.push(old.path().to_path_buf());
            }
        }

        fs::create_dir_all(&self.live_dir).map_err(|source| SwapError::LiveDirectory {
            dir: self.live_dir.clone(),
            source,
        })?;

        for (entry, target) in self.entries.iter().zip(targets) {
            fs::copy(entry.new.path(), &target).map_err(|source| SwapError::Install {
                plugin: entry.plugin.clone(),
                from: entry.new.path().to_path_buf(),
                to: target.clone(),
                source,
            })?;

            tracing::info!("{}: installed {}", entry.plugin, target.display());
            report.installed.push(target);
        }

        Ok(report)
    }
}

/// Delete `path`, treating an already missing file as done. Returns whether a file was removed.
fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

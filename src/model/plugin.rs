use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

/// A managed plugin: where its fresh build lives and where the server loads it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSpec {
    pub name: String,
    pub build_dir: PathBuf,
    pub live_dir: PathBuf,
}

impl PluginSpec {
    pub fn new(name: impl Into<String>, build_dir: PathBuf, live_dir: PathBuf) -> Self {
        Self {
            name: name.into(),
            build_dir,
            live_dir,
        }
    }
}

/// A single packaged artifact, identified by the path it was found at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactFile {
    path: PathBuf,
}

impl ArtifactFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> Option<&OsStr> {
        self.path.file_name()
    }

    pub fn parent(&self) -> Option<&Path> {
        self.path.parent()
    }
}

impl fmt::Display for ArtifactFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

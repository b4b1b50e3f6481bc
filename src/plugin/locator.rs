//! Resolve a logical plugin name to one packaged artifact inside a directory tree.
//!
//! The tree is walked depth-first. Within each directory, files come before
//! subdirectories and both are sorted by name, so a top-level jar always wins
//! over copies in data or cache folders. The first qualifying file wins;
//! duplicates resolve the same way on every platform and are logged.

use ignore::WalkBuilder;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::plugin::ArtifactFile;

/// Packaged-artifact extension, compared case-insensitively.
pub const ARTIFACT_EXTENSION: &str = "jar";

/// Name fragments marking documentation and source bundles.
const EXCLUDED_MARKERS: [&str; 2] = ["javadoc", "sources"];

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("directory {} for plugin {plugin} does not exist", .dir.display())]
    MissingDirectory { plugin: String, dir: PathBuf },

    #[error("lookup failed for plugin {plugin} in directory {}: {source}", .dir.display())]
    Walk {
        plugin: String,
        dir: PathBuf,
        #[source]
        source: ignore::Error,
    },
}

/// Whether `file_name` is a packaged artifact for the plugin called `name`.
pub fn is_candidate(file_name: &str, name: &str) -> bool {
    let has_extension = match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name[idx + 1..].eq_ignore_ascii_case(ARTIFACT_EXTENSION),
        _ => false,
    };

    has_extension
        && file_name.starts_with(name)
        && !EXCLUDED_MARKERS
            .iter()
            .any(|marker| file_name.contains(marker))
}

/// Every artifact under `dir` matching `name`, in traversal order.
pub fn find_candidates(dir: &Path, name: &str) -> Result<Vec<ArtifactFile>, LocateError> {
    if !dir.is_dir() {
        return Err(LocateError::MissingDirectory {
            plugin: name.to_string(),
            dir: dir.to_path_buf(),
        });
    }

    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .sort_by_file_path(files_first)
        .build();

    let mut found = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| LocateError::Walk {
            plugin: name.to_string(),
            dir: dir.to_path_buf(),
            source,
        })?;

        if entry.file_type().is_none_or(|kind| kind.is_dir()) {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };

        if is_candidate(file_name, name) {
            found.push(ArtifactFile::new(entry.into_path()));
        }
    }

    Ok(found)
}

fn files_first(a: &Path, b: &Path) -> Ordering {
    (a.is_dir(), a.file_name()).cmp(&(b.is_dir(), b.file_name()))
}

/// The canonical artifact for `name` under `dir`, or `None` when nothing qualifies.
pub fn locate(dir: &Path, name: &str) -> Result<Option<ArtifactFile>, LocateError> {
    let mut candidates = find_candidates(dir, name)?;
    if candidates.len() > 1 {
        tracing::warn!(
            "{} artifacts match plugin {name} in {}; using {}",
            candidates.len(),
            dir.display(),
            candidates[0]
        );
    }

    if candidates.is_empty() {
        Ok(None)
    } else {
        Ok(Some(candidates.swap_remove(0)))
    }
}

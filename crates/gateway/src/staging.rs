//! Per-request staging directories

use crate::{Error, Result};
use cannon_fingerprint::validate_path;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A directory holding one request's files
///
/// The directory is removed when this value is dropped.
#[derive(Debug)]
pub struct StagedFiles {
    dir: TempDir,
    written: Vec<PathBuf>,
}

impl StagedFiles {
    /// Root of the staged tree
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Files written, relative to `path()`, in path order
    #[must_use]
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

/// Write `files` into a fresh directory under `parent` (or the system temp dir)
///
/// Parent directories are created as needed. Paths that are absolute or
/// contain `..` are refused before anything is written.
pub async fn stage_files(
    parent: Option<&Path>,
    files: &BTreeMap<String, String>,
) -> Result<StagedFiles> {
    for path in files.keys() {
        validate_path(path)?;
    }

    let builder = {
        let mut b = tempfile::Builder::new();
        b.prefix("cannon-");
        b
    };
    let dir = match parent {
        Some(parent) => {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::staging(parent, e))?;
            builder.tempdir_in(parent)
        }
        None => builder.tempdir(),
    }
    .map_err(|e| Error::staging(parent.map_or_else(std::env::temp_dir, Path::to_path_buf), e))?;

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let relative = PathBuf::from(name);
        let target = dir.path().join(&relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::staging(parent, e))?;
        }
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| Error::staging(&target, e))?;
        written.push(relative);
    }

    tracing::debug!(
        dir = %dir.path().display(),
        files = written.len(),
        "Staged request files"
    );
    Ok(StagedFiles { dir, written })
}

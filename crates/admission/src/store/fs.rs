//! Filesystem-backed store
//!
//! Each key is stored as one file named by the SHA-256 of the key, using a
//! two-level directory structure:
//!
//! ```text
//! {root}/
//!   ab/
//!     cd/
//!       abcdef123456...  (value bytes)
//! ```
//!
//! Writes go through a temporary file and an atomic rename. Compare-and-swap
//! is serialised inside the process only; several processes sharing one root
//! get last-writer-wins semantics on windows.

use super::Store;
use crate::{Error, Result};
use async_trait::async_trait;
use dirs::{cache_dir, home_dir};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Store rooted at a local directory
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
    write_lock: Mutex<()>,
    tmp_counter: AtomicU64,
}

/// Places the default store root may live, most preferred first
///
/// ```text
/// $CANNON_STORE_DIR
/// $XDG_CACHE_HOME/cannon/store
/// <user cache dir>/cannon/store
/// ~/.cannon/store
/// $TMPDIR/cannon/store
/// ```
#[derive(Debug, Clone)]
struct RootCandidates {
    explicit: Option<PathBuf>,
    xdg_cache: Option<PathBuf>,
    user_cache: Option<PathBuf>,
    home: Option<PathBuf>,
    temp: PathBuf,
}

impl RootCandidates {
    fn from_env() -> Self {
        Self {
            explicit: env_path("CANNON_STORE_DIR"),
            xdg_cache: env_path("XDG_CACHE_HOME"),
            user_cache: cache_dir(),
            home: home_dir(),
            temp: std::env::temp_dir(),
        }
    }

    fn paths(self) -> impl Iterator<Item = PathBuf> {
        let caches = [self.xdg_cache, self.user_cache]
            .into_iter()
            .flatten()
            .map(|dir| dir.join("cannon").join("store"));
        self.explicit
            .into_iter()
            .chain(caches)
            .chain(self.home.map(|home| home.join(".cannon").join("store")))
            .chain(std::iter::once(self.temp.join("cannon").join("store")))
    }

    /// First candidate that exists (or can be created) and accepts new files
    fn resolve(self) -> Result<PathBuf> {
        let mut tried = Vec::new();
        for dir in self.paths() {
            match ensure_writable(&dir) {
                Ok(()) => return Ok(dir),
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = %e, "Skipping store root");
                    tried.push(dir.display().to_string());
                }
            }
        }
        Err(Error::configuration(format!(
            "no writable store directory (tried {})",
            tried.join(", ")
        )))
    }
}

/// Create `dir` if needed and check a file can be created inside it
///
/// Existing directories can still be read-only, so creation alone is not
/// enough.
fn ensure_writable(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    tempfile::tempfile_in(dir).map(drop)
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

impl FsStore {
    /// Create a store at `root`; directories are created on first write
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
            tmp_counter: AtomicU64::new(0),
        }
    }

    /// Create a store at the first writable default location
    pub fn at_default_root() -> Result<Self> {
        let root = RootCandidates::from_env().resolve()?;
        tracing::debug!(root = %root.display(), "Resolved store root");
        Ok(Self::new(root))
    }

    /// Store root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path holding the value for `key`
    ///
    /// Uses a two-level directory structure: `{root}/{h[0:2]}/{h[2:4]}/{h}`
    #[must_use]
    pub fn key_path(&self, key: &str) -> PathBuf {
        let hex = hex::encode(Sha256::digest(key.as_bytes()));
        self.root.join(&hex[0..2]).join(&hex[2..4]).join(hex)
    }

    async fn read(&self, path: &Path, operation: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_unavailable(operation, path, &e)),
        }
    }

    async fn write(&self, path: &Path, value: &[u8], operation: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_unavailable(operation, parent, &e))?;
        }

        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp_path = path.with_extension(format!("{}.{n}.tmp", std::process::id()));
        tokio::fs::write(&tmp_path, value)
            .await
            .map_err(|e| io_unavailable(operation, &tmp_path, &e))?;

        // Atomic rename to final location
        if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(io_unavailable(operation, path, &e));
        }
        Ok(())
    }
}

fn io_unavailable(operation: &str, path: &Path, err: &std::io::Error) -> Error {
    Error::store_unavailable(operation, format!("{}: {err}", path.display()))
}

#[async_trait]
impl Store for FsStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.read(&self.key_path(key), "get").await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(&self.key_path(key), &value, "set").await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: Vec<u8>,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let path = self.key_path(key);
        let current = self.read(&path, "compare_and_swap").await?;
        if current.as_deref() != expected {
            return Ok(false);
        }
        self.write(&path, &new, "compare_and_swap").await?;
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "fs"
    }
}

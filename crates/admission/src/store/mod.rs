//! Shared key-value store abstraction
//!
//! The admission controller keeps two kinds of records in a store shared by
//! every request-handling worker:
//!
//! ```text
//! window/<client-id>               -> ClientWindow (JSON)
//! result/<fingerprint>/<image-id>  -> CachedResult (JSON)
//! ```
//!
//! Stores only need per-key primitives. `compare_and_swap` is what lets the
//! limiter update a window without losing concurrent admissions.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use crate::Result;
use crate::config::StoreConfig;
use async_trait::async_trait;
use cannon_fingerprint::Fingerprint;
use std::sync::Arc;

/// Per-key store used for client windows and cached results
#[async_trait]
pub trait Store: Send + Sync {
    /// Read the value at `key`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Unconditionally write `value` at `key`
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Write `new` at `key` only if the current value equals `expected`
    ///
    /// `expected == None` means the key must be absent. Returns whether the
    /// write happened.
    async fn compare_and_swap(&self, key: &str, expected: Option<&[u8]>, new: Vec<u8>)
    -> Result<bool>;

    /// Get the name of the store
    fn name(&self) -> &'static str;
}

/// Store key for a client's window
#[must_use]
pub fn window_key(client_id: &str) -> String {
    format!("window/{client_id}")
}

/// Store key for a cached result
///
/// Results are scoped to the image they ran in, so one request run in two
/// differently built images keeps two entries.
#[must_use]
pub fn result_key(fingerprint: &Fingerprint, image: &Fingerprint) -> String {
    format!("result/{fingerprint}/{image}")
}

/// Create a store from configuration
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn Store>> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreConfig::Fs { root: Some(root) } => Ok(Arc::new(FsStore::new(root.clone()))),
        StoreConfig::Fs { root: None } => Ok(Arc::new(FsStore::at_default_root()?)),
    }
}

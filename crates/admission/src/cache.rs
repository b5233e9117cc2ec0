//! Cached execution results

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Captured output of a completed execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResult {
    /// Standard output lines
    pub stdout: Vec<String>,
    /// Standard error lines
    pub stderr: Vec<String>,
}

impl CachedResult {
    /// Create from captured line sequences
    #[must_use]
    pub fn new(stdout: Vec<String>, stderr: Vec<String>) -> Self {
        Self { stdout, stderr }
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::serialization(format!("Failed to decode cached result: {e}")))
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| Error::serialization(format!("Failed to encode cached result: {e}")))
    }
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// A result is stored for the fingerprint
    Hit(CachedResult),
    /// Nothing stored, or the caller asked to bypass the cache
    Miss,
}

impl CacheLookup {
    /// Whether this is a hit
    #[must_use]
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    /// The cached result, if any
    #[must_use]
    pub fn into_result(self) -> Option<CachedResult> {
        match self {
            Self::Hit(result) => Some(result),
            Self::Miss => None,
        }
    }
}

//! Configuration types for admission control

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Rate limiting and store access policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Admitted requests allowed per client within one window
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Sliding window width in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Deadline for each individual store call, in milliseconds
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// How expired timestamps leave a full window
    #[serde(default)]
    pub eviction: EvictionPolicy,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            window_secs: default_window_secs(),
            store_timeout_ms: default_store_timeout_ms(),
            eviction: EvictionPolicy::default(),
        }
    }
}

impl AdmissionConfig {
    /// Reject values the limiter cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::configuration("capacity must be at least 1"));
        }
        if self.window_secs == 0 {
            return Err(Error::configuration("window_secs must be at least 1"));
        }
        if self.store_timeout_ms == 0 {
            return Err(Error::configuration("store_timeout_ms must be at least 1"));
        }
        Ok(())
    }

    /// Window width as a duration
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Per-call store deadline as a duration
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Eviction strategy for a full client window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Evict at most the single oldest timestamp per call, and only once it
    /// has aged out of the window. Approximate: a window may briefly hold
    /// stale entries behind a fresh oldest one.
    #[default]
    Oldest,

    /// Drop every timestamp older than the window before deciding.
    Expired,
}

/// Which shared store backs the controller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local map; state is lost on exit
    #[default]
    Memory,

    /// One file per key on local disk
    Fs {
        /// Store root; resolved from the environment when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        root: Option<PathBuf>,
    },
}

// Default value functions
fn default_capacity() -> usize {
    2
}

fn default_window_secs() -> u64 {
    60
}

fn default_store_timeout_ms() -> u64 {
    2000
}

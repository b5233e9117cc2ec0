//! Gateway configuration

use crate::{Error, Result};
use cannon_admission::{AdmissionConfig, StoreConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the request gateway
///
/// ```toml
/// execution_timeout_secs = 60
///
/// [admission]
/// capacity = 2
/// window_secs = 60
///
/// [store]
/// kind = "fs"
/// root = "/var/cache/cannon"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Rate limiting and store deadlines
    #[serde(default)]
    pub admission: AdmissionConfig,

    /// Backing store for windows and cached results
    #[serde(default)]
    pub store: StoreConfig,

    /// Upper bound on a single execution
    #[serde(default = "default_execution_timeout_secs")]
    pub execution_timeout_secs: u64,

    /// Parent directory for per-request staging directories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            admission: AdmissionConfig::default(),
            store: StoreConfig::default(),
            execution_timeout_secs: default_execution_timeout_secs(),
            staging_dir: None,
        }
    }
}

impl GatewayConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| Error::configuration(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), "Loaded gateway configuration");
        Self::from_toml_str(&text)
    }

    /// Reject values that would make the gateway unusable
    pub fn validate(&self) -> Result<()> {
        self.admission.validate()?;
        if self.execution_timeout_secs == 0 {
            return Err(Error::configuration(
                "execution_timeout_secs must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Execution deadline as a `Duration`
    #[must_use]
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_secs)
    }
}

fn default_execution_timeout_secs() -> u64 {
    60
}

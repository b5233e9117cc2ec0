//! Request orchestration
//!
//! `Gateway::handle` drives one request through the full cycle:
//!
//! ```text
//! resolve defaults ─► validate ─► fingerprint ─► lookup ──hit──► Cached
//!                                                  │
//!                                                 miss
//!                                                  ▼
//!                                                admit ──denied──► RateLimited
//!                                                  │
//!                                               allowed
//!                                                  ▼
//!                                stage ─► execute (bounded) ─► record ─► Executed
//! ```

use crate::config::GatewayConfig;
use crate::executor::{ExecutionJob, Executor};
use crate::output::CapturedOutput;
use crate::preset::{ImageSpec, RuntimePreset};
use crate::staging::stage_files;
use crate::{Error, Result};
use cannon_admission::{
    Admission, AdmissionController, CacheLookup, Clock, Store, SystemClock, open_store,
};
use cannon_fingerprint::{ExecutionRequest, Fingerprint};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A request with defaults applied, ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    /// Request after default substitution
    pub request: ExecutionRequest,
    /// Image the command runs in
    pub image: ImageSpec,
    /// Fingerprint of the resolved request
    pub fingerprint: Fingerprint,
}

/// Apply runtime defaults, validate and fingerprint `request`
///
/// Touches neither the store nor the executor.
pub fn resolve(mut request: ExecutionRequest) -> Result<ResolvedRequest> {
    let preset = RuntimePreset::for_runtime(request.runtime);
    preset.apply_defaults(&mut request);
    request.validate()?;
    let image = preset.image_for(&request);
    let fingerprint = request.fingerprint();
    Ok(ResolvedRequest {
        request,
        image,
        fingerprint,
    })
}

/// Where an outcome's output came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeSource {
    /// Replayed from the result cache
    Cached,
    /// Produced by running the command
    Executed,
}

/// Result of handling one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Fingerprint of the resolved request
    pub fingerprint: Fingerprint,
    /// Whether the command ran for this request
    pub source: OutcomeSource,
    /// Captured output
    pub output: CapturedOutput,
    /// Exit code of the run; absent for cached results
    pub exit_code: Option<i32>,
}

impl Outcome {
    /// Whether the result was served from the cache
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.source == OutcomeSource::Cached
    }
}

/// Handles execution requests against a store and an executor
pub struct Gateway {
    config: GatewayConfig,
    controller: AdmissionController,
    executor: Arc<dyn Executor>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .field("controller", &self.controller)
            .field("executor", &self.executor.name())
            .finish()
    }
}

impl Gateway {
    /// Create a gateway over an existing store
    pub fn new(
        config: GatewayConfig,
        store: Arc<dyn Store>,
        executor: Arc<dyn Executor>,
    ) -> Result<Self> {
        Self::with_clock(config, store, executor, Arc::new(SystemClock))
    }

    /// Create a gateway with an explicit time source for rate limiting
    pub fn with_clock(
        config: GatewayConfig,
        store: Arc<dyn Store>,
        executor: Arc<dyn Executor>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let controller = AdmissionController::with_clock(store, config.admission.clone(), clock)?;
        Ok(Self {
            config,
            controller,
            executor,
        })
    }

    /// Create a gateway whose store is opened from `config.store`
    pub fn from_config(config: GatewayConfig, executor: Arc<dyn Executor>) -> Result<Self> {
        let store = open_store(&config.store)?;
        Self::new(config, store, executor)
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Underlying admission controller
    #[must_use]
    pub fn controller(&self) -> &AdmissionController {
        &self.controller
    }

    /// Handle one request from `client_id`
    ///
    /// Cached results are returned without consulting the rate limiter.
    /// Results are cached per request fingerprint and image identity.
    /// With `bypass` set the cache is skipped and the request always runs
    /// (subject to rate limiting); its output still replaces any cached
    /// entry. Every completed run is recorded whatever its exit code;
    /// timeouts and executor failures are not.
    pub async fn handle(
        &self,
        request: ExecutionRequest,
        client_id: &str,
        bypass: bool,
    ) -> Result<Outcome> {
        let resolved = resolve(request)?;
        let fingerprint = resolved.fingerprint;
        let image_id = resolved.image.id();

        let lookup = self
            .controller
            .lookup(&fingerprint, &image_id, bypass)
            .await?;
        if let CacheLookup::Hit(cached) = lookup {
            info!(
                client = %client_id,
                fingerprint = %fingerprint.short(),
                image = %image_id.short(),
                "Serving cached result"
            );
            return Ok(Outcome {
                fingerprint,
                source: OutcomeSource::Cached,
                output: cached.into(),
                exit_code: None,
            });
        }

        match self.controller.admit(client_id).await? {
            Admission::Denied { retry_after } => {
                return Err(Error::RateLimited {
                    client: client_id.to_string(),
                    retry_after_ms: u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX),
                });
            }
            Admission::Allowed { remaining } => {
                debug!(client = %client_id, remaining, "Admitted request");
            }
        }

        let staged = stage_files(self.config.staging_dir.as_deref(), &resolved.request.files).await?;
        let job = ExecutionJob {
            workdir: staged.path().to_path_buf(),
            command: resolved.request.command,
            image: resolved.image,
        };

        info!(
            client = %client_id,
            fingerprint = %fingerprint.short(),
            runtime = %resolved.request.runtime,
            executor = self.executor.name(),
            "Executing request"
        );
        let raw = match tokio::time::timeout(
            self.config.execution_timeout(),
            self.executor.execute(&job),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    fingerprint = %fingerprint.short(),
                    timeout_secs = self.config.execution_timeout_secs,
                    "Execution timed out"
                );
                return Err(Error::ExecutionTimeout {
                    seconds: self.config.execution_timeout_secs,
                });
            }
        };
        drop(staged);

        let output = CapturedOutput::from_raw(&raw.stdout, &raw.stderr);
        self.controller
            .record(
                &fingerprint,
                &image_id,
                output.stdout.clone(),
                output.stderr.clone(),
            )
            .await?;

        Ok(Outcome {
            fingerprint,
            source: OutcomeSource::Executed,
            output,
            exit_code: Some(raw.exit_code),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cannon_fingerprint::Runtime;

    #[test]
    fn resolve_substitutes_defaults_before_fingerprinting() {
        let resolved = resolve(ExecutionRequest::new(Runtime::Go)).unwrap();
        assert_eq!(resolved.request.command, "go run main.go");
        assert!(resolved.request.files.contains_key("main.go"));
        assert_eq!(resolved.fingerprint, resolved.request.fingerprint());
        assert_eq!(resolved.image.base, "golang:1.21.4-bullseye");
    }

    #[test]
    fn resolve_rejects_escaping_paths() {
        let request = ExecutionRequest::new(Runtime::Go).with_file("../x.go", "package main");
        assert!(matches!(resolve(request), Err(Error::Request(_))));
    }

    #[test]
    fn outcome_serializes_source_in_lowercase() {
        let outcome = Outcome {
            fingerprint: resolve(ExecutionRequest::new(Runtime::Rust))
                .unwrap()
                .fingerprint,
            source: OutcomeSource::Cached,
            output: CapturedOutput::default(),
            exit_code: None,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["source"], "cached");
        assert!(outcome.is_cached());
    }
}

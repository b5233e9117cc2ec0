//! Subcommand implementations

use crate::cli::{CliError, EXIT_OK, RequestArgs, RunArgs};
use cannon_admission::StoreConfig;
use cannon_fingerprint::{ExecutionRequest, Runtime};
use cannon_gateway::{Gateway, GatewayConfig, HostExecutor, Outcome, resolve};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Build a request from command-line arguments
pub fn build_request(args: &RequestArgs) -> miette::Result<ExecutionRequest> {
    if let Some(path) = &args.request {
        let body = std::fs::read(path).map_err(|e| CliError::Input {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        return Ok(ExecutionRequest::from_json(&body)?);
    }

    let runtime: Runtime = args.runtime.parse()?;
    let mut request = ExecutionRequest::new(runtime);
    for file in &args.files {
        let content = std::fs::read_to_string(&file.local).map_err(|e| CliError::Input {
            path: file.local.display().to_string(),
            message: e.to_string(),
        })?;
        request.files.insert(file.remote.clone(), content);
    }
    if let Some(command) = &args.command {
        request.command.clone_from(command);
    }
    request.validate()?;
    Ok(request)
}

/// Gateway configuration for the CLI
///
/// Without a file the CLI keeps results in the default on-disk store so
/// they survive between invocations.
pub fn load_config(path: Option<&Path>) -> miette::Result<GatewayConfig> {
    match path {
        Some(path) => Ok(GatewayConfig::load(path)?),
        None => Ok(GatewayConfig {
            store: StoreConfig::Fs { root: None },
            ..GatewayConfig::default()
        }),
    }
}

/// What `cannon fingerprint` reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FingerprintReport {
    /// Request fingerprint
    pub fingerprint: String,
    /// Runtime tag
    pub runtime: String,
    /// Command after default substitution
    pub command: String,
    /// Paths included in the request
    pub files: Vec<String>,
    /// Base image reference
    pub image: String,
    /// Identity of the image including setup steps
    pub image_id: String,
}

/// Compute the fingerprint report for a request
pub fn fingerprint(args: &RequestArgs) -> miette::Result<FingerprintReport> {
    let resolved = resolve(build_request(args)?)?;
    Ok(FingerprintReport {
        fingerprint: resolved.fingerprint.to_string(),
        runtime: resolved.request.runtime.to_string(),
        command: resolved.request.command,
        files: resolved.request.files.into_keys().collect(),
        image: resolved.image.base.clone(),
        image_id: resolved.image.id().to_string(),
    })
}

/// Run a request through a gateway backed by the host executor
pub async fn run(args: &RunArgs) -> miette::Result<Outcome> {
    let request = build_request(&args.request)?;
    let config = load_config(args.config.as_deref())?;
    let gateway = Gateway::from_config(config, Arc::new(HostExecutor::new()))?;
    tracing::debug!(?gateway, "Gateway ready");
    Ok(gateway.handle(request, &args.client, args.no_cache).await?)
}

/// Process exit code for an outcome
///
/// Cached results exit successfully; executed ones mirror the command.
#[must_use]
pub fn exit_code_for(outcome: &Outcome) -> u8 {
    match outcome.exit_code {
        None | Some(0) => EXIT_OK,
        Some(code) => u8::try_from(code).unwrap_or(1),
    }
}

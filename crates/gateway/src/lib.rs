//! Request handling for cannon
//!
//! Wraps the admission controller with everything a request needs before and
//! after it is admitted:
//! - `RuntimePreset`: image, default files and default command per runtime
//! - `stage_files`: a fresh working directory populated with the request files
//! - `Executor`: the seam to the execution backend (`HostExecutor` by default)
//! - `CapturedOutput`: stdout/stderr split into lines, replayable as a transcript
//! - `Gateway`: the end-to-end cycle from request to `Outcome`

#![expect(
    clippy::missing_errors_doc,
    reason = "Error documentation to be added incrementally"
)]

pub mod config;
mod error;
pub mod executor;
pub mod gateway;
pub mod output;
pub mod preset;
pub mod staging;

// Re-export error types at crate root
pub use error::{Error, Result};

// Re-export main types
pub use config::GatewayConfig;
pub use executor::{ExecutionJob, ExecutionOutput, Executor, HostExecutor};
pub use gateway::{Gateway, Outcome, OutcomeSource, ResolvedRequest, resolve};
pub use output::CapturedOutput;
pub use preset::{ImageSpec, RuntimePreset};
pub use staging::{StagedFiles, stage_files};

//! Execution backends
//!
//! The gateway hands every admitted request to an `Executor`. The default
//! backend is `HostExecutor`, which runs the command directly on the host
//! inside the staging directory. It ignores the requested image and offers
//! no isolation; container backends implement the same trait.

use crate::preset::ImageSpec;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// One command to run over a staged directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionJob {
    /// Directory holding the request's files
    pub workdir: PathBuf,
    /// Shell command line
    pub command: String,
    /// Image the command should run in
    pub image: ImageSpec,
}

/// Raw result of a completed execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutput {
    /// Everything written to standard output
    pub stdout: String,
    /// Everything written to standard error
    pub stderr: String,
    /// Process exit code; -1 when terminated by a signal
    pub exit_code: i32,
}

impl ExecutionOutput {
    /// Whether the command exited with status zero
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Trait for execution backends
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run `job` to completion and return its output
    ///
    /// A non-zero exit code is a completed execution, not an error. Errors
    /// mean the command could not be run at all.
    async fn execute(&self, job: &ExecutionJob) -> Result<ExecutionOutput>;

    /// Get the name of the backend
    fn name(&self) -> &'static str;
}

/// Host executor - runs `sh -c <command>` in the job's working directory
#[derive(Debug, Clone, Default)]
pub struct HostExecutor {
    shell: Option<String>,
}

impl HostExecutor {
    /// Executor using `sh`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor using a different POSIX shell (e.g. `bash`)
    #[must_use]
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: Some(shell.into()),
        }
    }
}

#[async_trait]
impl Executor for HostExecutor {
    async fn execute(&self, job: &ExecutionJob) -> Result<ExecutionOutput> {
        let shell = self.shell.as_deref().unwrap_or("sh");
        tracing::info!(
            backend = "host",
            image = %job.image.base,
            workdir = %job.workdir.display(),
            "Executing command on host"
        );

        let output = Command::new(shell)
            .arg("-c")
            .arg(&job.command)
            .current_dir(&job.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::execution_failed(format!("failed to spawn {shell}: {e}")))?;

        let exit_code = output.status.code().unwrap_or(-1);
        if !output.status.success() {
            tracing::warn!(exit = exit_code, "Command exited unsuccessfully");
        }

        Ok(ExecutionOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code,
        })
    }

    fn name(&self) -> &'static str {
        "host"
    }
}

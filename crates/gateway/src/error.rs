//! Error types for the gateway crate

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for request handling
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The request was rejected before fingerprinting
    #[error(transparent)]
    #[diagnostic(transparent)]
    Request(#[from] cannon_fingerprint::Error),

    /// The admission controller or its store failed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Admission(#[from] cannon_admission::Error),

    /// The client exhausted its rate limit
    #[error("Too many requests from {client}; retry in {retry_after_ms}ms")]
    #[diagnostic(
        code(cannon::gateway::rate_limited),
        help("Wait for the window to free a slot, or resend an identical earlier request")
    )]
    RateLimited {
        /// Client identity that was throttled
        client: String,
        /// Time until a slot frees up
        retry_after_ms: u64,
    },

    /// Request files could not be written to the staging directory
    #[error("Failed to stage {}: {source}", path.display())]
    #[diagnostic(code(cannon::gateway::staging))]
    Staging {
        /// Path being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The execution did not finish in time
    #[error("Execution timed out after {seconds}s")]
    #[diagnostic(code(cannon::gateway::execution_timeout))]
    ExecutionTimeout {
        /// Deadline that was exceeded
        seconds: u64,
    },

    /// The executor could not run the command
    #[error("Execution failed: {message}")]
    #[diagnostic(code(cannon::gateway::execution_failed))]
    ExecutionFailed {
        /// What went wrong
        message: String,
    },

    /// Gateway configuration could not be loaded or is invalid
    #[error("Gateway configuration error: {message}")]
    #[diagnostic(code(cannon::gateway::config))]
    Configuration {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a staging error
    #[must_use]
    pub fn staging(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Staging {
            path: path.into(),
            source,
        }
    }

    /// Create an execution failure
    #[must_use]
    pub fn execution_failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            message: msg.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Whether the caller may retry the same request later
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Admission(e) => e.is_retryable(),
            Self::RateLimited { .. } => true,
            _ => false,
        }
    }
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for the fingerprint crate

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Error type for request validation
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum Error {
    /// The request cannot be fingerprinted or executed as given
    #[error("Malformed request: {message}")]
    #[diagnostic(
        code(cannon::fingerprint::malformed_request),
        help("Supported runtimes are: rust, go, maelstrom-go. File paths must be relative.")
    )]
    MalformedRequest {
        /// What is wrong with the request
        message: String,
    },
}

impl Error {
    /// Create a malformed request error
    #[must_use]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: msg.into(),
        }
    }
}

/// Result type for fingerprint operations
pub type Result<T> = std::result::Result<T, Error>;

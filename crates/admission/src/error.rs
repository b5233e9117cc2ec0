//! Error types for the admission crate

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Error type for admission and result cache operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The shared store could not be read or written
    #[error("Store unavailable during {operation}: {message}")]
    #[diagnostic(
        code(cannon::admission::store_unavailable),
        help("The request can be retried once the store is reachable again")
    )]
    StoreUnavailable {
        /// Operation that failed (e.g., "get", "set", "compare_and_swap")
        operation: String,
        /// What went wrong
        message: String,
    },

    /// A store call exceeded its deadline
    #[error("Store {operation} timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(cannon::admission::store_timeout),
        help("Raise store_timeout_ms or check the store's health")
    )]
    StoreTimeout {
        /// Operation that timed out
        operation: String,
        /// Deadline that was exceeded
        timeout_ms: u64,
    },

    /// Concurrent writers kept invalidating a read-modify-write cycle
    #[error("Gave up updating {key} after {attempts} conflicting writes")]
    #[diagnostic(code(cannon::admission::contention))]
    Contention {
        /// Store key under contention
        key: String,
        /// Number of attempts made
        attempts: usize,
    },

    /// A stored record could not be encoded or decoded
    #[error("Serialization error: {message}")]
    #[diagnostic(code(cannon::admission::serialization))]
    Serialization {
        /// Error message describing the serialization issue
        message: String,
    },

    /// Configuration or validation error
    #[error("Admission configuration error: {message}")]
    #[diagnostic(code(cannon::admission::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },
}

impl Error {
    /// Create a store unavailable error
    #[must_use]
    pub fn store_unavailable(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a store timeout error
    #[must_use]
    pub fn store_timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::StoreTimeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
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

    /// Whether the caller may retry the request later
    ///
    /// Nothing in this crate retries on its own.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StoreUnavailable { .. } | Self::StoreTimeout { .. } | Self::Contention { .. } => {
                true
            }
            Self::Serialization { .. } | Self::Configuration { .. } => false,
        }
    }
}

/// Result type for admission operations
pub type Result<T> = std::result::Result<T, Error>;

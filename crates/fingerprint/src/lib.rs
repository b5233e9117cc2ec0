//! Request fingerprints for cannon
//!
//! This crate owns the execution request model and the fingerprint engine:
//! - `ExecutionRequest`: files, command, runtime and optional image build inputs
//! - `Runtime`: the closed set of execution profiles
//! - `fingerprint`: a deterministic, order-independent request identifier
//! - `image_fingerprint`: identity of a custom execution image
//!
//! # Fingerprint Computation
//!
//! A fingerprint is computed from:
//! - The command string (after any default substitution)
//! - The runtime tag
//! - A SHA-256 digest of every file's content, keyed by its relative path
//!
//! Paths are visited in sorted order, so two requests that carry the same
//! files in a different insertion order share a fingerprint. The fingerprint
//! doubles as the result cache key and as an idempotency key.

mod error;
pub mod fingerprint;
pub mod request;

// Re-export error types at crate root
pub use error::{Error, Result};

// Re-export main types
pub use fingerprint::{
    Fingerprint, FingerprintEnvelope, content_digest, fingerprint, image_fingerprint,
};
pub use request::{ExecutionRequest, ImageBuildArgs, Runtime, validate_path};

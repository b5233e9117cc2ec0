//! Deterministic request fingerprints

use crate::request::{ImageBuildArgs, Runtime};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Version of the canonical encoding; bumping it invalidates every cached result
const ENCODING_VERSION: &str = "cannon-fp-v1";

/// A request fingerprint (SHA-256 as hex string)
///
/// Deserialisation goes through [`Fingerprint::from_hex`], so every value
/// holds exactly 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Create from hex string (validation)
    ///
    /// # Errors
    ///
    /// Returns error if the hex string is invalid or wrong length
    pub fn from_hex(hex: impl Into<String>) -> Result<Self> {
        let s = hex.into();
        if s.len() != 64 {
            return Err(Error::malformed(format!(
                "fingerprint must be 64 hex characters, got {}",
                s.len()
            )));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::malformed("fingerprint must contain only hex digits"));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Get the hex representation
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = Error;

    fn try_from(hex: String) -> Result<Self> {
        Self::from_hex(hex)
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human-readable form of what a fingerprint covers
///
/// Not hashed directly; `fingerprint` feeds the same fields through a
/// length-prefixed encoding. Useful for explaining cache misses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintEnvelope {
    /// Encoding version
    pub version: String,
    /// Runtime tag
    pub runtime: String,
    /// Command to execute
    pub command: String,
    /// Relative path to SHA-256 of content
    pub files: BTreeMap<String, String>,
}

impl FingerprintEnvelope {
    /// Build the envelope for a request's parts
    #[must_use]
    pub fn new(files: &BTreeMap<String, String>, command: &str, runtime: Runtime) -> Self {
        Self {
            version: ENCODING_VERSION.to_string(),
            runtime: runtime.tag().to_string(),
            command: command.to_string(),
            files: files
                .iter()
                .map(|(path, content)| (path.clone(), content_digest(content)))
                .collect(),
        }
    }

    /// Hash the envelope into a fingerprint
    #[must_use]
    pub fn digest(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        write_field(&mut hasher, "version", self.version.as_bytes());
        write_field(&mut hasher, "runtime", self.runtime.as_bytes());
        write_field(&mut hasher, "command", self.command.as_bytes());
        write_files(&mut hasher, "files", &self.files);
        Fingerprint(hex::encode(hasher.finalize()))
    }
}

/// SHA-256 of a file's content as hex
#[must_use]
pub fn content_digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Compute the fingerprint of `(command, runtime, {path: sha256(content)})`
///
/// Callers substitute any default command before calling. Never fails; empty
/// file sets and empty commands are valid inputs.
#[must_use]
pub fn fingerprint(files: &BTreeMap<String, String>, command: &str, runtime: Runtime) -> Fingerprint {
    let fp = FingerprintEnvelope::new(files, command, runtime).digest();
    tracing::trace!(
        fingerprint = %fp,
        runtime = %runtime,
        file_count = files.len(),
        "Computed request fingerprint"
    );
    fp
}

/// Identity of a custom execution image
///
/// Covers the base image reference, the ordered setup steps and, when
/// present, the build files and build command.
#[must_use]
pub fn image_fingerprint(
    base_image: &str,
    setup_steps: &[String],
    build: Option<&ImageBuildArgs>,
) -> Fingerprint {
    let mut hasher = Sha256::new();
    write_field(&mut hasher, "version", ENCODING_VERSION.as_bytes());
    write_field(&mut hasher, "base", base_image.as_bytes());
    write_len(&mut hasher, "setup", setup_steps.len());
    for step in setup_steps {
        write_field(&mut hasher, "step", step.as_bytes());
    }
    match build {
        Some(args) => {
            let digests: BTreeMap<String, String> = args
                .files
                .iter()
                .map(|(path, content)| (path.clone(), content_digest(content)))
                .collect();
            write_field(&mut hasher, "build", b"some");
            write_field(&mut hasher, "build_command", args.command.as_bytes());
            write_files(&mut hasher, "build_files", &digests);
        }
        None => write_field(&mut hasher, "build", b"none"),
    }
    Fingerprint(hex::encode(hasher.finalize()))
}

// Every field is tagged and length-prefixed so that no two distinct inputs
// share an encoding (e.g. command "ab" + path "c" vs command "a" + path "bc").
fn write_field(hasher: &mut Sha256, tag: &str, value: &[u8]) {
    write_len(hasher, tag, value.len());
    hasher.update(value);
}

fn write_len(hasher: &mut Sha256, tag: &str, len: usize) {
    hasher.update(tag.as_bytes());
    hasher.update([0u8]);
    hasher.update((len as u64).to_le_bytes());
}

fn write_files(hasher: &mut Sha256, tag: &str, files: &BTreeMap<String, String>) {
    write_len(hasher, tag, files.len());
    for (path, digest) in files {
        write_field(hasher, "path", path.as_bytes());
        write_field(hasher, "sha256", digest.as_bytes());
    }
}

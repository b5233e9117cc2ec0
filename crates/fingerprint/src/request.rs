//! Execution request model

use crate::fingerprint::{Fingerprint, fingerprint};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Target language / execution profile
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Runtime {
    /// Cargo project on the official Rust image
    #[default]
    Rust,
    /// Single-module Go program
    Go,
    /// Go node tested under the Maelstrom distributed-systems workbench
    MaelstromGo,
}

impl Runtime {
    /// Every supported runtime, in declaration order
    pub const ALL: [Self; 3] = [Self::Rust, Self::Go, Self::MaelstromGo];

    /// Stable tag used in fingerprints and on the wire
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Go => "go",
            Self::MaelstromGo => "maelstrom-go",
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Runtime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|rt| rt.tag() == normalized)
            .ok_or_else(|| Error::malformed(format!("unknown runtime '{s}'")))
    }
}

// Request bodies spell runtimes loosely ("GO", "maelstrom_go").
impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(serde::de::Error::custom)
    }
}

/// Inputs used to build a custom execution image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBuildArgs {
    /// Files copied into the image before the build command runs
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    /// Command run inside the image to warm its build cache
    #[serde(default)]
    pub command: String,
}

/// A request to run a command over a set of source files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Relative path to file contents
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    /// Shell command; empty means "use the runtime default"
    #[serde(default)]
    pub command: String,
    /// Target runtime
    #[serde(default, rename = "language", alias = "runtime")]
    pub runtime: Runtime,
    /// Optional custom image inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_build_args: Option<ImageBuildArgs>,
}

impl ExecutionRequest {
    /// Create a request for `runtime` with no files and no command
    #[must_use]
    pub fn new(runtime: Runtime) -> Self {
        Self {
            runtime,
            ..Self::default()
        }
    }

    /// Add a file to the request
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Set the shell command
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Parse a request body
    ///
    /// An unknown runtime tag or a structurally invalid body is reported as
    /// a malformed request.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRequest` for invalid JSON, unknown runtimes or bad paths
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let request: Self = serde_json::from_slice(body)
            .map_err(|e| Error::malformed(format!("invalid request body: {e}")))?;
        request.validate()?;
        Ok(request)
    }

    /// Check every file path (including image build files)
    ///
    /// # Errors
    ///
    /// Returns `MalformedRequest` naming the first offending path
    pub fn validate(&self) -> Result<()> {
        for path in self.files.keys() {
            validate_path(path)?;
        }
        if let Some(args) = &self.image_build_args {
            for path in args.files.keys() {
                validate_path(path)?;
            }
        }
        Ok(())
    }

    /// Fingerprint of this request's command, runtime and file contents
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(&self.files, &self.command, self.runtime)
    }
}

/// Validate a request file path
///
/// Paths must be non-empty, relative and spelled in one canonical form:
/// `/`-separated segments with no empty, `.` or `..` segments. Every file
/// name therefore stages to a distinct regular file inside the staging
/// directory.
///
/// # Errors
///
/// Returns `MalformedRequest` describing why the path was refused
pub fn validate_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(Error::malformed("file path must not be empty"));
    }
    if path.contains('\0') {
        return Err(Error::malformed(format!(
            "file path '{}' contains a NUL byte",
            path.escape_debug()
        )));
    }
    if path.starts_with('/') || Path::new(path).has_root() {
        return Err(Error::malformed(format!(
            "file path '{path}' must be relative"
        )));
    }
    if path.ends_with('/') {
        return Err(Error::malformed(format!(
            "file path '{path}' names a directory"
        )));
    }
    for segment in path.split('/') {
        let problem = match segment {
            "" => "an empty segment",
            "." => "a '.' segment",
            ".." => "'..'",
            _ => continue,
        };
        return Err(Error::malformed(format!(
            "file path '{path}' must not contain {problem}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_parses_tags_case_insensitively() {
        assert_eq!("rust".parse::<Runtime>().unwrap(), Runtime::Rust);
        assert_eq!("GO".parse::<Runtime>().unwrap(), Runtime::Go);
        assert_eq!(
            "maelstrom_go".parse::<Runtime>().unwrap(),
            Runtime::MaelstromGo
        );
        assert_eq!(
            " Maelstrom-Go ".parse::<Runtime>().unwrap(),
            Runtime::MaelstromGo
        );
    }

    #[test]
    fn runtime_rejects_unknown_tag() {
        let err = "python".parse::<Runtime>().unwrap_err();
        assert!(matches!(err, Error::MalformedRequest { .. }));
        assert!(err.to_string().contains("python"));
    }

    #[test]
    fn runtime_display_matches_tag() {
        for rt in Runtime::ALL {
            assert_eq!(rt.to_string(), rt.tag());
        }
    }

    #[test]
    fn request_body_defaults() {
        let req = ExecutionRequest::from_json(b"{}").unwrap();
        assert!(req.files.is_empty());
        assert!(req.command.is_empty());
        assert_eq!(req.runtime, Runtime::Rust);
        assert!(req.image_build_args.is_none());
    }

    #[test]
    fn request_body_accepts_language_field() {
        let body = br#"{"files": {"main.go": "package main"}, "command": "go run main.go", "language": "go"}"#;
        let req = ExecutionRequest::from_json(body).unwrap();
        assert_eq!(req.runtime, Runtime::Go);
        assert_eq!(req.command, "go run main.go");
        assert_eq!(req.files.len(), 1);
    }

    #[test]
    fn request_body_language_is_case_insensitive() {
        let req = ExecutionRequest::from_json(br#"{"language": "GO"}"#).unwrap();
        assert_eq!(req.runtime, Runtime::Go);
        let req = ExecutionRequest::from_json(br#"{"runtime": "maelstrom_go"}"#).unwrap();
        assert_eq!(req.runtime, Runtime::MaelstromGo);
    }

    #[test]
    fn request_body_with_unknown_language_is_malformed() {
        let err = ExecutionRequest::from_json(br#"{"language": "cobol"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedRequest { .. }));
    }

    #[test]
    fn request_body_with_escaping_path_is_malformed() {
        let body = br#"{"files": {"../etc/passwd": "x"}}"#;
        let err = ExecutionRequest::from_json(body).unwrap_err();
        assert!(err.to_string().contains(".."));
    }

    #[test]
    fn validate_path_accepts_nested_relative_paths() {
        assert!(validate_path("src/main.rs").is_ok());
        assert!(validate_path(".cargo/config.toml").is_ok());
        assert!(validate_path("a/b/c/d.txt").is_ok());
    }

    #[test]
    fn validate_path_rejects_bad_paths() {
        for bad in [
            "",
            "   ",
            "/etc/passwd",
            "../x",
            "a/../../b",
            ".",
            "a\0b",
            "main.go/",
            "src/",
            "./a",
            "a/./b",
            "a//b",
        ] {
            assert!(validate_path(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn aliases_of_one_file_cannot_both_be_sent() {
        let req = ExecutionRequest::new(Runtime::Go)
            .with_file("a", "one")
            .with_file("./a", "two");
        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("./a"));

        let body = br#"{"files": {"main.go/": "package main"}, "language": "go"}"#;
        let err = ExecutionRequest::from_json(body).unwrap_err();
        assert!(err.to_string().contains("directory"));
    }

    #[test]
    fn validate_checks_image_build_files() {
        let mut req = ExecutionRequest::new(Runtime::Go);
        req.image_build_args = Some(ImageBuildArgs {
            files: BTreeMap::from([("/abs".to_string(), String::new())]),
            command: "go install".to_string(),
        });
        assert!(req.validate().is_err());
    }

    #[test]
    fn builder_helpers_populate_request() {
        let req = ExecutionRequest::new(Runtime::Go)
            .with_file("main.go", "package main")
            .with_command("go run main.go");
        assert_eq!(req.files.get("main.go").map(String::as_str), Some("package main"));
        assert_eq!(req.command, "go run main.go");
    }
}

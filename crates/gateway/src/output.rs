//! Captured execution output

use cannon_admission::CachedResult;
use serde::{Deserialize, Serialize};

/// Output of one execution as non-empty, newline-terminated lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    /// Standard output lines
    pub stdout: Vec<String>,
    /// Standard error lines
    pub stderr: Vec<String>,
}

impl CapturedOutput {
    /// Split raw stream contents into lines
    #[must_use]
    pub fn from_raw(stdout: &str, stderr: &str) -> Self {
        Self {
            stdout: split_lines(stdout),
            stderr: split_lines(stderr),
        }
    }

    /// Lines as streamed back to a client: every stderr line first, then
    /// every stdout line, each prefixed with its stream name
    #[must_use]
    pub fn transcript(&self) -> Vec<String> {
        let stderr = self.stderr.iter().map(|line| format!("stderr: {line}"));
        let stdout = self.stdout.iter().map(|line| format!("stdout: {line}"));
        stderr.chain(stdout).collect()
    }
}

impl From<CachedResult> for CapturedOutput {
    fn from(result: CachedResult) -> Self {
        Self {
            stdout: result.stdout,
            stderr: result.stderr,
        }
    }
}

fn split_lines(raw: &str) -> Vec<String> {
    raw.split('\n')
        .filter(|line| !line.is_empty())
        .map(|line| format!("{line}\n"))
        .collect()
}

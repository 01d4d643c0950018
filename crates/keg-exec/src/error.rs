//! Failure taxonomy for install sessions.

use std::fmt;

use serde::Serialize;

/// Captured output kept in a failure payload is truncated to this many bytes
/// per stream, keeping the tail where the interesting lines usually are.
const MAX_CAPTURED_BYTES: usize = 64 * 1024;

/// Why a session ended in `Failed`.
///
/// Each variant names the stage it is attributable to and carries enough
/// detail to be printed verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The work directory could not be created.
    #[error("failed to set up session: {message}")]
    Session { message: String },

    /// The archive could not be downloaded.
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// The archive digest did not match the formula.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// The archive could not be unpacked.
    #[error("extraction failed: {message}")]
    Extract { message: String },

    /// A dependency check or install command failed.
    #[error("build failed: {0}")]
    Build(StepFailure),

    /// A dependency check or test command failed.
    #[error("test failed: {0}")]
    Test(StepFailure),

    /// The user interrupted the session.
    #[error("interrupted")]
    Interrupted,
}

impl FailureReason {
    /// Short stable name, e.g. `"checksum_mismatch"`.
    pub fn kind(&self) -> &'static str {
        match self {
            FailureReason::Session { .. } => "session",
            FailureReason::Fetch { .. } => "fetch",
            FailureReason::ChecksumMismatch { .. } => "checksum_mismatch",
            FailureReason::Extract { .. } => "extract",
            FailureReason::Build(_) => "build",
            FailureReason::Test(_) => "test",
            FailureReason::Interrupted => "interrupted",
        }
    }

    /// Exit code of the failing subprocess, if the failure came from one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            FailureReason::Build(step) | FailureReason::Test(step) => step.exit_code,
            _ => None,
        }
    }

    /// The step payload for subprocess stages.
    pub fn step(&self) -> Option<&StepFailure> {
        match self {
            FailureReason::Build(step) | FailureReason::Test(step) => Some(step),
            _ => None,
        }
    }
}

/// Details of a failed build or test step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    /// The command line that failed, or `None` for a dependency check.
    pub command: Option<String>,

    /// Exit code; `None` if the process never ran or died from a signal.
    pub exit_code: Option<i32>,

    /// What went wrong, in one line.
    pub message: String,

    /// Captured stdout (tail-truncated).
    pub stdout: String,

    /// Captured stderr (tail-truncated).
    pub stderr: String,
}

impl StepFailure {
    /// A failure that happened before any process produced output.
    pub fn without_output(command: Option<String>, message: impl Into<String>) -> Self {
        Self {
            command,
            exit_code: None,
            message: message.into(),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// A failure from a process that ran and exited unsuccessfully.
    pub fn from_output(
        command: String,
        exit_code: Option<i32>,
        stdout: &[u8],
        stderr: &[u8],
    ) -> Self {
        let message = match exit_code {
            Some(code) => format!("exited with code {code}"),
            None => "terminated by signal".to_string(),
        };
        Self {
            command: Some(command),
            exit_code,
            message,
            stdout: tail_lossy(stdout),
            stderr: tail_lossy(stderr),
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.command {
            Some(ref cmd) => write!(f, "`{cmd}` {}", self.message)?,
            None => f.write_str(&self.message)?,
        }
        for (label, text) in [("stdout", &self.stdout), ("stderr", &self.stderr)] {
            let text = text.trim_end();
            if !text.is_empty() {
                write!(f, "\n--- {label} ---\n{text}")?;
            }
        }
        Ok(())
    }
}

/// Decode captured output, keeping at most the last [`MAX_CAPTURED_BYTES`].
fn tail_lossy(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(MAX_CAPTURED_BYTES);
    let text = String::from_utf8_lossy(&bytes[start..]);
    if start > 0 {
        format!("[... {start} bytes truncated ...]\n{text}")
    } else {
        text.into_owned()
    }
}

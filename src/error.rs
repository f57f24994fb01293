//! Error types for the patch, checkpoint, recovery and build-verify seams.

use std::path::PathBuf;
use thiserror::Error;

/// Refusals and I/O failures from the patch engine.
#[derive(Error, Debug)]
pub enum PatchError {
    /// The normalized path resolves outside the project root.
    #[error("Refusing to write outside the project root: {path}")]
    PathEscapeAttempt { path: String },

    #[error("Edit operation has an empty path")]
    EmptyPath,

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PatchError {
    pub fn is_security_rejection(&self) -> bool {
        matches!(self, PatchError::PathEscapeAttempt { .. } | PatchError::EmptyPath)
    }
}

/// Failures while taking or restoring a version-control checkpoint.
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot was captured but could not be put back; it is still in the stash list.
    #[error("Snapshot '{name}' could not be reapplied ({reason}); recover it with `git stash list`")]
    ReapplyFailed { name: String, reason: String },
}

/// Every recovery stage was exhausted. The raw text is kept for inspection.
#[derive(Error, Debug, Clone)]
#[error("No edit plan could be recovered from {} characters of response text", raw.chars().count())]
pub struct ParseFailure {
    pub raw: String,
}

/// A verification command that did not pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildFailure {
    #[error("Verification timed out after {:.1}s", *millis as f64 / 1000.0)]
    Timeout { millis: u64, output: String },

    #[error("Verification failed with exit code {}", code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    CommandFailed { code: Option<i32>, output: String },

    #[error("Verification command could not be started: {0}")]
    Spawn(String),
}

impl BuildFailure {
    /// Captured output, used as repair context.
    pub fn output(&self) -> &str {
        match self {
            BuildFailure::Timeout { output, .. } => output,
            BuildFailure::CommandFailed { output, .. } => output,
            BuildFailure::Spawn(message) => message,
        }
    }
}

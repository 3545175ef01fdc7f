//! Git gateway error types.

use std::time::Duration;

/// Errors from driving the working copy.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    /// The `git` process could not be spawned or the filesystem failed.
    #[error("git I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A git command exited with a non-zero status.
    #[error("`git {command}` failed with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// A git command did not finish in time.
    #[error("`git {command}` timed out after {elapsed:?}")]
    Timeout { command: String, elapsed: Duration },

    /// The working copy is not usable.
    #[error("invalid working copy {path}: {reason}")]
    InvalidWorkingCopy { path: String, reason: String },
}

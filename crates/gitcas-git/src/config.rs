//! Working copy configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default per-command timeout. Pushes of large batches dominate.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for a [`GitCli`](crate::GitCli) working copy.
#[derive(Debug, Clone)]
pub struct GitConfig {
    /// Directory of the working copy. Created and initialized if missing.
    pub work_dir: PathBuf,
    /// Name of the remote to fetch from and push to.
    pub remote: String,
    /// URL registered for `remote` when the working copy is initialized.
    pub remote_url: Option<String>,
    /// Commit author and committer name.
    pub author_name: String,
    /// Commit author and committer email.
    pub author_email: String,
    /// Upper bound on any single git command.
    pub command_timeout: Duration,
}

impl GitConfig {
    /// Configuration with default remote and identity.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            remote: "origin".to_string(),
            remote_url: None,
            author_name: "gitcas".to_string(),
            author_email: "gitcas@localhost".to_string(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Register `url` as the remote when initializing.
    pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url = Some(url.into());
        self
    }
}

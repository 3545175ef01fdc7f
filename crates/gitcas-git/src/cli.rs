//! # `git` Binary Gateway
//!
//! [`GitCli`] implements [`RepoGateway`] by running the `git` executable
//! against a working copy. Every invocation is bounded by
//! [`GitConfig::command_timeout`] and runs with terminal prompts disabled
//! so a missing credential fails fast instead of hanging the batch loop.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use gitcas_core::BranchId;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::config::GitConfig;
use crate::error::GitError;
use crate::RepoGateway;

/// Working copy driven through the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    config: GitConfig,
}

impl GitCli {
    /// Open the working copy, initializing it when `.git` is missing.
    ///
    /// On initialization the configured remote URL, if any, is registered
    /// under [`GitConfig::remote`].
    pub async fn open(config: GitConfig) -> Result<Self, GitError> {
        tokio::fs::create_dir_all(&config.work_dir).await?;
        let cli = Self { config };
        let git_dir = cli.config.work_dir.join(".git");
        if !tokio::fs::try_exists(&git_dir).await? {
            cli.run(&["init", "-q"]).await?;
            if let Some(url) = cli.config.remote_url.clone() {
                let remote = cli.config.remote.clone();
                cli.run(&["remote", "add", remote.as_str(), url.as_str()]).await?;
            }
            tracing::info!(work_dir = %cli.config.work_dir.display(), "initialized working copy");
        } else if !git_dir.is_dir() {
            return Err(GitError::InvalidWorkingCopy {
                path: cli.config.work_dir.display().to_string(),
                reason: ".git exists but is not a directory".into(),
            });
        }
        Ok(cli)
    }

    /// The configuration this gateway was opened with.
    pub fn config(&self) -> &GitConfig {
        &self.config
    }

    /// Run a git command and return its stdout.
    async fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<String, GitError> {
        let command = args
            .iter()
            .map(|a| a.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        debug!(command = %command, "git");

        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(&self.config.work_dir)
            .arg("-c")
            .arg(format!("user.name={}", self.config.author_name))
            .arg("-c")
            .arg(format!("user.email={}", self.config.author_email))
            .args(args.iter().map(|a| a.as_ref()))
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match timeout(self.config.command_timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(GitError::Timeout {
                    command,
                    elapsed: self.config.command_timeout,
                })
            }
        };

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Remove every entry of the working tree except `.git`.
    async fn clear_work_tree(&self) -> Result<(), GitError> {
        let mut entries = tokio::fs::read_dir(&self.config.work_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name() == ".git" {
                continue;
            }
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                tokio::fs::remove_dir_all(&path).await?;
            } else {
                tokio::fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }

    fn remote_ref(&self, name: &str) -> String {
        format!("{}/{}", self.config.remote, name)
    }
}

#[async_trait]
impl RepoGateway for GitCli {
    fn work_dir(&self) -> &Path {
        &self.config.work_dir
    }

    async fn checkout_orphan(&self, branch: BranchId) -> Result<(), GitError> {
        let name = branch.name();
        // A leftover local ref from an earlier failed attempt blocks --orphan.
        let local_ref = format!("refs/heads/{name}");
        if let Err(e) = self.run(&["update-ref", "-d", local_ref.as_str()]).await {
            debug!(branch = %name, "no stale local ref to delete: {e}");
        }
        self.run(&["checkout", "-q", "--orphan", name.as_str()]).await?;
        self.run(&["rm", "-r", "-q", "-f", "--cached", "--ignore-unmatch", "."])
            .await?;
        self.clear_work_tree().await
    }

    async fn checkout_existing(
        &self,
        branch: BranchId,
        fetch: bool,
        reset: bool,
    ) -> Result<(), GitError> {
        let name = branch.name();
        let remote_ref = self.remote_ref(&name);
        if fetch {
            let refspec = format!("+refs/heads/{name}:refs/remotes/{remote_ref}");
            let remote = self.config.remote.clone();
            self.run(&["fetch", "-q", remote.as_str(), refspec.as_str()]).await?;
        }

        let local_ref = format!("refs/heads/{name}");
        let has_local = self
            .run(&["rev-parse", "--verify", "-q", local_ref.as_str()])
            .await
            .is_ok();
        if has_local {
            self.run(&["checkout", "-q", "-f", name.as_str()]).await?;
        } else {
            self.run(&["checkout", "-q", "-f", "-B", name.as_str(), remote_ref.as_str()])
                .await?;
        }

        if reset {
            self.run(&["reset", "-q", "--hard", remote_ref.as_str()]).await?;
        }
        Ok(())
    }

    async fn stage(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add".to_string(), "-f".to_string(), "--".to_string()];
        args.extend(paths.iter().map(|p| p.display().to_string()));
        self.run(args.as_slice()).await.map(|_| ())
    }

    async fn commit(&self, message: &str) -> Result<(), GitError> {
        // --allow-empty: re-committing files identical to the tip must not
        // fail the batch.
        self.run(&["commit", "-q", "--allow-empty", "-m", message])
            .await
            .map(|_| ())
    }

    async fn push(&self, branch: BranchId) -> Result<(), GitError> {
        let name = branch.name();
        let remote = self.config.remote.clone();
        self.run(&["push", "-q", "-f", "-u", remote.as_str(), name.as_str()])
            .await
            .map(|_| ())
    }
}

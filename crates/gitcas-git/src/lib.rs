//! # gitcas-git: Repository Gateway
//!
//! The store persists assets by committing them to a git repository whose
//! branches are mirrored by a public CDN. This crate is the only place
//! that touches the working copy. It exposes the five primitives the batch
//! processor drives:
//!
//! | Primitive | Used when |
//! |-----------|-----------|
//! | [`RepoGateway::checkout_orphan`] | target branch has no recorded content |
//! | [`RepoGateway::checkout_existing`] | resuming a branch that already holds assets |
//! | [`RepoGateway::stage`] | adding exactly the files of one batch |
//! | [`RepoGateway::commit`] | one commit per batch |
//! | [`RepoGateway::push`] | force-push with upstream tracking |
//!
//! ## Single Writer
//!
//! `push` is a force-push. The store assumes it is the sole writer of the
//! repository's storage branches; a second concurrent writer would have
//! its commits overwritten.
//!
//! ## Implementations
//!
//! - [`GitCli`] drives the `git` binary through `tokio::process`.

pub mod cli;
pub mod config;
pub mod error;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use gitcas_core::BranchId;

pub use cli::GitCli;
pub use config::GitConfig;
pub use error::GitError;

/// Orchestration surface over a version-control working copy.
///
/// Callers must serialize calls; implementations are not expected to
/// tolerate interleaved checkouts.
#[async_trait]
pub trait RepoGateway: Send + Sync {
    /// Root of the working copy. Batch files are moved under this path
    /// before [`stage`](RepoGateway::stage).
    fn work_dir(&self) -> &Path;

    /// Create a branch with no ancestry and clear the working tree.
    async fn checkout_orphan(&self, branch: BranchId) -> Result<(), GitError>;

    /// Check out a branch that already has content on the remote.
    ///
    /// With `fetch`, the remote branch is fetched first. With `reset`, the
    /// local branch is hard-reset to the fetched remote tip afterwards.
    async fn checkout_existing(
        &self,
        branch: BranchId,
        fetch: bool,
        reset: bool,
    ) -> Result<(), GitError>;

    /// Stage exactly the given paths, relative to [`work_dir`](RepoGateway::work_dir).
    async fn stage(&self, paths: &[PathBuf]) -> Result<(), GitError>;

    /// Record one commit with the staged changes.
    async fn commit(&self, message: &str) -> Result<(), GitError>;

    /// Force-push the branch to the remote and set it as upstream.
    async fn push(&self, branch: BranchId) -> Result<(), GitError>;
}

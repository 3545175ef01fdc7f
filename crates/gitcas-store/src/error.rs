//! # Store Error Types
//!
//! Three classes of failure reach callers:
//!
//! - **Transient I/O**: fetch, filesystem, git, or metadata failures.
//!   Waiters of a failed batch all receive the same [`BatchFailure`].
//! - **Validation**: a bad name or unrecognizable content. Local to one
//!   `upload` call; never affects other queued tasks.
//! - **Lifecycle**: activating twice, or using a deactivated store.
//!
//! There is no fatal class. The batch loop logs and absorbs every error.

use gitcas_core::CoreError;
use gitcas_git::GitError;
use thiserror::Error;

use crate::metadata::MetadataError;
use crate::source::SourceError;

/// The step of a batch at which it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchStage {
    /// Re-checking drained tasks against the metadata store.
    Lookup,
    /// Checking out the target branch.
    Checkout,
    /// Moving scratch files into the working copy.
    Move,
    /// Staging the batch's files.
    Stage,
    /// Creating the batch commit.
    Commit,
    /// Force-pushing the branch.
    Push,
    /// Writing durable records after the push.
    Persist,
    /// The store was deactivated before the task was committed.
    Shutdown,
}

impl BatchStage {
    /// Stable lowercase name for logs and API error bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lookup => "lookup",
            Self::Checkout => "checkout",
            Self::Move => "move",
            Self::Stage => "stage",
            Self::Commit => "commit",
            Self::Push => "push",
            Self::Persist => "persist",
            Self::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for BatchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome delivered to every waiter of a batch that did not commit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("batch failed during {stage}: {message}")]
pub struct BatchFailure {
    /// Where the batch failed.
    pub stage: BatchStage,
    /// Rendered triggering error.
    pub message: String,
}

impl BatchFailure {
    /// Build a failure from the triggering error.
    pub fn new(stage: BatchStage, err: impl std::fmt::Display) -> Self {
        Self {
            stage,
            message: err.to_string(),
        }
    }
}

/// Errors returned by [`AssetStore`](crate::AssetStore) operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Resolving the upload source failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Scratch filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Working copy failure outside of a batch.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Metadata store failure.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// The batch that owned this upload failed.
    #[error(transparent)]
    Batch(#[from] BatchFailure),

    /// Invalid name, or content whose type cannot be inferred.
    #[error("validation error: {0}")]
    Validation(String),

    /// `activate` was called on a running store.
    #[error("asset store is already active")]
    AlreadyActive,

    /// The store has been deactivated.
    #[error("asset store is not active")]
    Inactive,
}

impl From<CoreError> for StoreError {
    fn from(e: CoreError) -> Self {
        Self::Validation(e.to_string())
    }
}

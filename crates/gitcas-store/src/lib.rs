//! # gitcas-store: Content-Addressed Asset Store
//!
//! Accepts uploads from many concurrent callers, deduplicates them by
//! SHA-256, batches them into commits on size-capped git branches, and
//! returns a stable public URL served by the branch mirror.
//!
//! ## Architecture
//!
//! ```text
//! upload ──► AssetStore ──► TaskQueue ◄── BatchProcessor ──► RepoGateway
//!               │                             │
//!               └──────► MetadataStore ◄──────┘
//! ```
//!
//! - [`AssetStore`] is the facade: source resolution, hashing, dedup and
//!   admission.
//! - [`TaskQueue`] holds one task per pending hash and its waiters.
//! - [`BatchProcessor`] is the single writer: it drains the queue, commits
//!   and pushes, then persists records and settles waiters.
//! - [`BranchAllocator`] derives the branch being filled from durable
//!   records.
//! - [`MetadataStore`] persists records; [`MemoryMetadataStore`] and
//!   [`PgMetadataStore`] implement it.
//!
//! ## Guarantees
//!
//! - A URL is returned only after its content has been pushed and its
//!   record persisted.
//! - Identical content is committed once; concurrent uploads of the same
//!   bytes share one task and one outcome.
//! - No branch exceeds its capacity through a single batch.

pub mod allocator;
pub mod config;
pub mod db;
pub mod error;
pub mod metadata;
pub mod processor;
pub mod queue;
mod retry;
pub mod scratch;
pub mod sniff;
pub mod source;
pub mod store;

pub use allocator::{Branch, BranchAllocator};
pub use config::{git_config_from_env, ConfigError, StoreConfig};
pub use db::{init_pool, PgMetadataStore};
pub use error::{BatchFailure, BatchStage, StoreError};
pub use metadata::{MemoryMetadataStore, MetadataError, MetadataStore};
pub use processor::{BatchProcessor, IterationOutcome, ProcessorParts};
pub use queue::{PendingTask, TaskQueue, Waiter};
pub use scratch::ScratchSpace;
pub use source::{AssetSource, HttpFetcher, SourceContent, SourceError};
pub use store::AssetStore;

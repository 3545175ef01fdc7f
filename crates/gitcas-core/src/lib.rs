//! # gitcas-core: Foundational Types
//!
//! Leaf crate of the workspace. Defines the types that form the durable
//! contract of the store: anything rendered here ends up inside a public
//! URL or a persisted row, so changing an encoding breaks existing links.
//!
//! ## Key Types
//!
//! - [`ContentDigest`]: SHA-256 over raw asset bytes; the dedup and
//!   storage key.
//! - [`BranchId`]: monotonically increasing shard id, rendered as
//!   zero-padded base-36 of width 8 for use as a branch name.
//! - [`AssetRecord`]: the durable record created after a batch is
//!   committed and pushed.
//! - [`MirrorConfig`] / [`public_url`]: pure construction of the CDN URL.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `gitcas-*` crates.
//! - No I/O. Everything here is a pure function of its inputs.

pub mod branch;
pub mod digest;
pub mod error;
pub mod mirror;
pub mod record;

pub use branch::BranchId;
pub use digest::ContentDigest;
pub use error::CoreError;
pub use mirror::{asset_path, public_url, MirrorConfig, DEFAULT_MIRROR_BASE};
pub use record::{AssetName, AssetRecord, AssetStats, NewAssetRecord};

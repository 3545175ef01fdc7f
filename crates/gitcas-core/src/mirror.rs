//! # Mirror URLs
//!
//! Assets are read through a public CDN that mirrors the repository by
//! branch. A URL is a pure function of the mirror coordinates and the
//! record's `{branch, hash, name}`; no lookup is needed once a record
//! exists.

use serde::{Deserialize, Serialize};

use crate::branch::BranchId;
use crate::digest::ContentDigest;
use crate::record::{AssetName, AssetRecord};

/// Default mirror base: jsDelivr's GitHub mirror.
pub const DEFAULT_MIRROR_BASE: &str = "https://cdn.jsdelivr.net/gh";

/// Coordinates of the mirrored repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Mirror base URL, without a trailing slash.
    pub base: String,
    /// Repository owner.
    pub user: String,
    /// Repository name.
    pub repo: String,
}

impl MirrorConfig {
    /// Coordinates on the default mirror.
    pub fn new(user: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            base: DEFAULT_MIRROR_BASE.to_string(),
            user: user.into(),
            repo: repo.into(),
        }
    }

    /// Override the mirror base.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Public URL of a durable record.
    pub fn url_for(&self, record: &AssetRecord) -> String {
        public_url(self, record.branch, &record.hash, &record.name)
    }
}

/// Path of an asset inside the working copy, relative to its root.
pub fn asset_path(hash: &ContentDigest, name: &AssetName) -> String {
    format!("{hash}-{name}")
}

/// Build the public URL `{base}/{user}/{repo}@{branch}/{hash}-{name}`.
pub fn public_url(
    mirror: &MirrorConfig,
    branch: BranchId,
    hash: &ContentDigest,
    name: &AssetName,
) -> String {
    format!(
        "{}/{}/{}@{}/{}",
        mirror.base.trim_end_matches('/'),
        mirror.user,
        mirror.repo,
        branch.name(),
        asset_path(hash, name)
    )
}

//! # Durable Asset Records
//!
//! An [`AssetRecord`] is written once, after the batch containing the
//! asset has been committed and pushed. It is never updated and never
//! deleted by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::branch::BranchId;
use crate::digest::ContentDigest;
use crate::error::CoreError;

/// Maximum length of a display filename, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// A validated display filename.
///
/// The name becomes a path component in the repository and a URL segment,
/// so it must be a single, non-hidden path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetName(String);

impl AssetName {
    /// Validate a display filename.
    pub fn new(name: &str) -> Result<Self, CoreError> {
        let trimmed = name.trim();
        let reject = |reason| CoreError::InvalidName {
            name: name.to_string(),
            reason,
        };
        if trimmed.is_empty() {
            return Err(reject("must not be empty"));
        }
        if trimmed.len() > MAX_NAME_LEN {
            return Err(reject("must not exceed 255 bytes"));
        }
        if trimmed.contains(|c: char| c == '/' || c == '\\') {
            return Err(reject("must not contain path separators"));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(reject("must not contain control characters"));
        }
        if trimmed.starts_with('.') {
            return Err(reject("must not start with '.'"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AssetName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<AssetName> for String {
    fn from(value: AssetName) -> Self {
        value.0
    }
}

/// A durably committed asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Store-assigned id. Strictly increasing in insertion order; this is
    /// the recency order used to find the active branch.
    pub id: i64,
    /// Content digest, unique across all records.
    pub hash: ContentDigest,
    /// Display filename.
    pub name: AssetName,
    /// Size in bytes.
    pub size: u64,
    /// Branch holding the asset.
    pub branch: BranchId,
    /// When the record was persisted.
    pub created_at: DateTime<Utc>,
}

/// The payload used to persist a record after a successful push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssetRecord {
    pub hash: ContentDigest,
    pub name: AssetName,
    pub size: u64,
    pub branch: BranchId,
}

/// Aggregate statistics over all durable records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetStats {
    /// Number of records.
    pub asset_count: u64,
    /// Sum of record sizes in bytes.
    pub asset_size: u64,
}

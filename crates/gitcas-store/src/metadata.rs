//! # Metadata Store
//!
//! Durable records of committed assets. A record is written only after its
//! batch has been pushed, and never mutated afterwards. The store answers
//! three questions for the rest of the crate:
//!
//! - has this content already been committed? ([`MetadataStore::find_by_hash`])
//! - which branch is currently being filled? ([`MetadataStore::latest`] plus
//!   [`MetadataStore::branch_size`])
//! - how much is stored in total? ([`MetadataStore::stats`])
//!
//! [`MemoryMetadataStore`] backs tests and database-less deployments;
//! [`PgMetadataStore`](crate::db::PgMetadataStore) backs production.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use gitcas_core::{AssetRecord, AssetStats, BranchId, ContentDigest, NewAssetRecord};
use parking_lot::RwLock;

/// Errors from a metadata backend.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row does not decode into an [`AssetRecord`].
    #[error("corrupt asset record: {0}")]
    Corrupt(String),
}

/// Persistence interface for asset records.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// The record with this content hash, if committed.
    async fn find_by_hash(&self, hash: &ContentDigest)
        -> Result<Option<AssetRecord>, MetadataError>;

    /// The most recently persisted record, by id descending.
    async fn latest(&self) -> Result<Option<AssetRecord>, MetadataError>;

    /// Summed size of every record on `branch`.
    async fn branch_size(&self, branch: BranchId) -> Result<u64, MetadataError>;

    /// Count and summed size over all records.
    async fn stats(&self) -> Result<AssetStats, MetadataError>;

    /// Insert each record whose hash is not yet present.
    ///
    /// Returns one record per input, in input order: the inserted row, or
    /// the existing row unchanged when the hash was already present.
    async fn upsert(&self, records: &[NewAssetRecord]) -> Result<Vec<AssetRecord>, MetadataError>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    records: Vec<AssetRecord>,
    by_hash: HashMap<ContentDigest, usize>,
}

/// In-process metadata store. State does not survive restarts.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every record in insertion order.
    pub fn records(&self) -> Vec<AssetRecord> {
        self.inner.read().records.clone()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn find_by_hash(
        &self,
        hash: &ContentDigest,
    ) -> Result<Option<AssetRecord>, MetadataError> {
        let inner = self.inner.read();
        Ok(inner
            .by_hash
            .get(hash)
            .and_then(|&idx| inner.records.get(idx))
            .cloned())
    }

    async fn latest(&self) -> Result<Option<AssetRecord>, MetadataError> {
        Ok(self
            .inner
            .read()
            .records
            .iter()
            .max_by_key(|r| r.id)
            .cloned())
    }

    async fn branch_size(&self, branch: BranchId) -> Result<u64, MetadataError> {
        Ok(self
            .inner
            .read()
            .records
            .iter()
            .filter(|r| r.branch == branch)
            .map(|r| r.size)
            .sum())
    }

    async fn stats(&self) -> Result<AssetStats, MetadataError> {
        let inner = self.inner.read();
        Ok(AssetStats {
            asset_count: inner.records.len() as u64,
            asset_size: inner.records.iter().map(|r| r.size).sum(),
        })
    }

    async fn upsert(&self, records: &[NewAssetRecord]) -> Result<Vec<AssetRecord>, MetadataError> {
        let mut inner = self.inner.write();
        let mut out = Vec::with_capacity(records.len());
        for new in records {
            if let Some(&idx) = inner.by_hash.get(&new.hash) {
                if let Some(existing) = inner.records.get(idx) {
                    out.push(existing.clone());
                    continue;
                }
            }
            let record = AssetRecord {
                id: inner.records.len() as i64 + 1,
                hash: new.hash,
                name: new.name.clone(),
                size: new.size,
                branch: new.branch,
                created_at: Utc::now(),
            };
            let idx = inner.records.len();
            inner.by_hash.insert(record.hash, idx);
            inner.records.push(record.clone());
            out.push(record);
        }
        Ok(out)
    }
}

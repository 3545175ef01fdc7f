//! # Branch Allocator
//!
//! Assets are sharded across branches so that no branch grows past the
//! configured capacity. The branch being filled is derived from durable
//! records, never from in-memory state, so a restarted process resumes
//! exactly where the last one stopped:
//!
//! 1. the most recent record (by id) names the current branch;
//! 2. that branch's size is the sum of its records' sizes;
//! 3. with no records at all, the first branch is `offset` with size 0.
//!
//! Rollover moves to `id + offset` with size 0. A size-0 branch is always
//! checked out as an orphan.

use gitcas_core::BranchId;

use crate::metadata::{MetadataError, MetadataStore};

/// A branch id together with the bytes already committed to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Branch {
    pub id: BranchId,
    pub size: u64,
}

impl Branch {
    /// Whether the branch holds nothing yet and must start as an orphan.
    pub fn is_fresh(&self) -> bool {
        self.size == 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BranchAllocator {
    capacity: u64,
    offset: u64,
}

impl BranchAllocator {
    /// An offset of zero would never roll over; it is raised to one.
    pub fn new(capacity: u64, offset: u64) -> Self {
        Self {
            capacity,
            offset: offset.max(1),
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Resolve the branch currently being filled.
    pub async fn current_branch(&self, store: &dyn MetadataStore) -> Result<Branch, MetadataError> {
        match store.latest().await? {
            Some(record) => {
                let size = store.branch_size(record.branch).await?;
                Ok(Branch {
                    id: record.branch,
                    size,
                })
            }
            None => Ok(Branch {
                id: BranchId::new(self.offset),
                size: 0,
            }),
        }
    }

    /// Pick the branch to write to: `current`, or a fresh successor when
    /// `current` is full or a rollover is forced.
    pub fn select_branch(&self, current: Branch, force_new: bool) -> Branch {
        if force_new || current.size >= self.capacity {
            Branch {
                id: current.id.next(self.offset),
                size: 0,
            }
        } else {
            current
        }
    }

    /// Bytes that still fit on `branch`.
    pub fn remaining(&self, branch: &Branch) -> u64 {
        self.capacity.saturating_sub(branch.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MemoryMetadataStore;
    use gitcas_core::{AssetName, ContentDigest, NewAssetRecord};

    async fn seed(store: &MemoryMetadataStore, tag: &str, size: u64, branch: u64) {
        store
            .upsert(&[NewAssetRecord {
                hash: ContentDigest::of(tag.as_bytes()),
                name: AssetName::new(tag).unwrap(),
                size,
                branch: BranchId::new(branch),
            }])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_store_starts_at_offset() {
        let store = MemoryMetadataStore::new();
        let alloc = BranchAllocator::new(100, 1);
        let branch = alloc.current_branch(&store).await.unwrap();
        assert_eq!(branch, Branch { id: BranchId::new(1), size: 0 });
        assert!(branch.is_fresh());
    }

    #[tokio::test]
    async fn current_branch_follows_latest_record() {
        let store = MemoryMetadataStore::new();
        seed(&store, "a", 10, 1).await;
        seed(&store, "b", 4, 2).await;
        seed(&store, "c", 6, 2).await;
        let alloc = BranchAllocator::new(100, 1);
        let branch = alloc.current_branch(&store).await.unwrap();
        assert_eq!(branch, Branch { id: BranchId::new(2), size: 10 });
    }

    #[test]
    fn select_rolls_over_when_full_or_forced() {
        let alloc = BranchAllocator::new(50, 1);
        let partial = Branch { id: BranchId::new(3), size: 20 };
        assert_eq!(alloc.select_branch(partial, false), partial);
        assert_eq!(
            alloc.select_branch(partial, true),
            Branch { id: BranchId::new(4), size: 0 }
        );
        let full = Branch { id: BranchId::new(3), size: 50 };
        assert_eq!(
            alloc.select_branch(full, false),
            Branch { id: BranchId::new(4), size: 0 }
        );
    }

    #[test]
    fn custom_offset_steps_ids() {
        let alloc = BranchAllocator::new(1, 10);
        let next = alloc.select_branch(Branch { id: BranchId::new(10), size: 1 }, false);
        assert_eq!(next.id, BranchId::new(20));
    }

    #[test]
    fn remaining_saturates() {
        let alloc = BranchAllocator::new(50, 1);
        assert_eq!(alloc.remaining(&Branch { id: BranchId::new(1), size: 20 }), 30);
        assert_eq!(alloc.remaining(&Branch { id: BranchId::new(1), size: 80 }), 0);
    }
}

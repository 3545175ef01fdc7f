//! # Asset Store
//!
//! The public entry point. `upload` turns a source into a durable public
//! URL:
//!
//! 1. resolve the source and hash the content;
//! 2. if a record already exists, return its URL without queueing;
//! 3. if a task for the hash is queued or in flight, wait on it;
//! 4. otherwise name the content, write it to scratch, enqueue, and wait.
//!
//! Uploads may be admitted before [`AssetStore::activate`]; they settle
//! once the batch loop runs.

use std::sync::Arc;

use chrono::Utc;
use gitcas_core::{AssetName, AssetRecord, AssetStats, ContentDigest};
use gitcas_git::RepoGateway;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::allocator::BranchAllocator;
use crate::config::StoreConfig;
use crate::error::{BatchFailure, BatchStage, StoreError};
use crate::metadata::MetadataStore;
use crate::processor::{BatchProcessor, ProcessorParts};
use crate::queue::{PendingTask, TaskQueue};
use crate::scratch::ScratchSpace;
use crate::sniff::infer_name;
use crate::source::{AssetSource, HttpFetcher};

enum Lifecycle {
    Inactive,
    Active {
        cancel: CancellationToken,
        handle: JoinHandle<()>,
    },
    Deactivated,
}

pub struct AssetStore {
    config: StoreConfig,
    metadata: Arc<dyn MetadataStore>,
    queue: Arc<TaskQueue>,
    fetcher: HttpFetcher,
    scratch: ScratchSpace,
    lifecycle: Mutex<Lifecycle>,
}

impl AssetStore {
    pub fn new(config: StoreConfig, metadata: Arc<dyn MetadataStore>, fetcher: HttpFetcher) -> Self {
        let scratch = ScratchSpace::new(config.scratch_dir.clone());
        Self {
            config,
            metadata,
            queue: Arc::new(TaskQueue::new()),
            fetcher,
            scratch,
            lifecycle: Mutex::new(Lifecycle::Inactive),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The admission queue shared with the batch loop.
    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// Store content named by `source` and return its public URL.
    pub async fn upload(&self, source: &str, name: Option<&str>) -> Result<String, StoreError> {
        self.ensure_usable()?;
        let source = AssetSource::parse(source)?;
        let content = self.fetcher.resolve(source).await?;
        self.ingest(content.bytes, name, content.media_type.as_deref())
            .await
    }

    /// Store raw bytes and return their public URL.
    pub async fn upload_bytes(
        &self,
        bytes: Vec<u8>,
        name: Option<&str>,
    ) -> Result<String, StoreError> {
        self.ensure_usable()?;
        self.ingest(bytes, name, None).await
    }

    /// Store raw bytes whose media type is known.
    pub async fn upload_typed(
        &self,
        bytes: Vec<u8>,
        name: Option<&str>,
        media_type: Option<&str>,
    ) -> Result<String, StoreError> {
        self.ensure_usable()?;
        self.ingest(bytes, name, media_type).await
    }

    async fn ingest(
        &self,
        bytes: Vec<u8>,
        name: Option<&str>,
        media_type: Option<&str>,
    ) -> Result<String, StoreError> {
        let size = bytes.len() as u64;
        let (hash, bytes) = tokio::task::spawn_blocking(move || (ContentDigest::of(&bytes), bytes))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?;

        if let Some(record) = self.metadata.find_by_hash(&hash).await? {
            debug!(hash = %hash, branch = %record.branch, "upload deduplicated against record");
            return Ok(self.url_for(&record));
        }
        if let Some(waiter) = self.queue.attach(&hash) {
            debug!(hash = %hash, "upload attached to pending task");
            return waiter.wait().await;
        }

        let name = match name {
            Some(n) => AssetName::new(n)?,
            None => infer_name(&bytes, media_type, Utc::now())?,
        };
        let scratch_path = self.scratch.write(&hash, &bytes).await?;
        drop(bytes);
        debug!(hash = %hash, name = %name, size, "upload queued");
        let waiter = self.queue.enqueue(PendingTask {
            hash,
            name,
            size,
            scratch_path,
        });
        // Deactivation may have swept the queue while this upload was
        // being written to scratch.
        if self.ensure_usable().is_err() {
            self.queue.reject(
                std::slice::from_ref(&hash),
                &BatchFailure::new(BatchStage::Shutdown, "asset store deactivated"),
            );
        }
        waiter.wait().await
    }

    /// Count and total size of committed assets.
    pub async fn stats(&self) -> Result<AssetStats, StoreError> {
        Ok(self.metadata.stats().await?)
    }

    /// The committed record for `hash`, if any.
    pub async fn find(&self, hash: &ContentDigest) -> Result<Option<AssetRecord>, StoreError> {
        Ok(self.metadata.find_by_hash(hash).await?)
    }

    /// Public URL of a committed record.
    pub fn url_for(&self, record: &AssetRecord) -> String {
        self.config.mirror.url_for(record)
    }

    /// A batch processor sharing this store's queue and metadata.
    ///
    /// [`activate`](Self::activate) runs one in the background; callers
    /// that want to drive iterations themselves can build their own.
    pub fn processor(&self, gateway: Arc<dyn RepoGateway>) -> BatchProcessor {
        BatchProcessor::new(ProcessorParts {
            queue: self.queue.clone(),
            metadata: self.metadata.clone(),
            gateway,
            allocator: BranchAllocator::new(self.config.branch_capacity, self.config.branch_offset),
            scratch: self.scratch.clone(),
            mirror: self.config.mirror.clone(),
            flush_interval: self.config.flush_interval,
            fetch_before_write: self.config.fetch_before_write,
            reset_to_remote: self.config.reset_to_remote,
        })
    }

    /// Start the batch loop against `gateway`.
    pub fn activate(&self, gateway: Arc<dyn RepoGateway>) -> Result<(), StoreError> {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            Lifecycle::Active { .. } => return Err(StoreError::AlreadyActive),
            Lifecycle::Deactivated => return Err(StoreError::Inactive),
            Lifecycle::Inactive => {}
        }

        let processor = self.processor(gateway);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(processor.run(cancel.clone()));
        *lifecycle = Lifecycle::Active { cancel, handle };
        info!("asset store activated");
        Ok(())
    }

    /// Stop the batch loop and reject every task still pending.
    ///
    /// A batch in progress is allowed to finish first. The store cannot be
    /// activated again.
    pub async fn deactivate(&self) {
        let previous = std::mem::replace(&mut *self.lifecycle.lock(), Lifecycle::Deactivated);
        if let Lifecycle::Active { cancel, handle } = previous {
            cancel.cancel();
            if let Err(e) = handle.await {
                tracing::error!("batch processor task ended abnormally: {e}");
            }
        }
        let rejected = self.queue.reject_all(&BatchFailure::new(
            BatchStage::Shutdown,
            "asset store deactivated",
        ));
        info!(rejected, "asset store deactivated");
    }

    pub fn is_active(&self) -> bool {
        matches!(*self.lifecycle.lock(), Lifecycle::Active { .. })
    }

    fn ensure_usable(&self) -> Result<(), StoreError> {
        if matches!(*self.lifecycle.lock(), Lifecycle::Deactivated) {
            return Err(StoreError::Inactive);
        }
        Ok(())
    }
}

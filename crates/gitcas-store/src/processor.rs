//! # Batch Processor
//!
//! The single writer to the working copy. Each iteration:
//!
//! ```text
//! Idle → Fill → Checkout → Commit+Push → Persist → Settle
//! ```
//!
//! - **Fill** drains the queue against the current branch's remaining
//!   capacity, rolling over to a fresh branch when nothing fits.
//! - **Checkout** starts an orphan for a fresh branch and otherwise resumes
//!   the existing one.
//! - **Commit+Push** moves the batch's scratch files into place, stages
//!   exactly those paths, commits once and force-pushes.
//! - **Persist** writes one record per task. Records are written only
//!   after the push succeeds.
//! - **Settle** resolves every waiter with its public URL.
//!
//! A failure anywhere after Fill rejects every waiter of the batch with
//! one shared [`BatchFailure`]. The loop logs it and carries on; it only
//! exits when cancelled.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use gitcas_core::{asset_path, BranchId, ContentDigest, MirrorConfig, NewAssetRecord};
use gitcas_git::RepoGateway;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::allocator::{Branch, BranchAllocator};
use crate::error::{BatchFailure, BatchStage, StoreError};
use crate::metadata::MetadataStore;
use crate::queue::{PendingTask, TaskQueue};
use crate::scratch::ScratchSpace;

/// What one iteration of the loop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// The queue was empty.
    Idle,
    /// The head task is larger than a whole branch; nothing was drained.
    CapacityExhausted { head_size: u64 },
    /// Every drained task had already been committed by an earlier batch.
    AlreadyDurable { assets: usize },
    /// A batch was committed, pushed and persisted.
    Committed {
        branch: BranchId,
        assets: usize,
        bytes: u64,
    },
    /// A batch failed and its waiters were rejected.
    Failed { branch: BranchId, stage: BatchStage },
}

/// Everything the loop needs, owned by its task.
pub struct BatchProcessor {
    queue: Arc<TaskQueue>,
    metadata: Arc<dyn MetadataStore>,
    gateway: Arc<dyn RepoGateway>,
    allocator: BranchAllocator,
    scratch: ScratchSpace,
    mirror: MirrorConfig,
    flush_interval: Duration,
    fetch_before_write: bool,
    reset_to_remote: bool,
}

/// Construction parameters for a [`BatchProcessor`].
pub struct ProcessorParts {
    pub queue: Arc<TaskQueue>,
    pub metadata: Arc<dyn MetadataStore>,
    pub gateway: Arc<dyn RepoGateway>,
    pub allocator: BranchAllocator,
    pub scratch: ScratchSpace,
    pub mirror: MirrorConfig,
    pub flush_interval: Duration,
    pub fetch_before_write: bool,
    pub reset_to_remote: bool,
}

impl BatchProcessor {
    pub fn new(parts: ProcessorParts) -> Self {
        Self {
            queue: parts.queue,
            metadata: parts.metadata,
            gateway: parts.gateway,
            allocator: parts.allocator,
            scratch: parts.scratch,
            mirror: parts.mirror,
            flush_interval: parts.flush_interval,
            fetch_before_write: parts.fetch_before_write,
            reset_to_remote: parts.reset_to_remote,
        }
    }

    /// Run iterations until `cancel` fires.
    ///
    /// The loop waits `flush_interval` when there is nothing it can commit:
    /// an empty queue, an oversized head task, or an error before Fill.
    /// While a backlog remains after a batch, the next one starts at once.
    /// Cancellation interrupts the wait but never a batch in progress.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            flush_interval = ?self.flush_interval,
            capacity = self.allocator.capacity(),
            "batch processor started"
        );
        let mut wait = true;
        loop {
            if wait {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.flush_interval) => {}
                }
            } else if cancel.is_cancelled() {
                break;
            }
            wait = match self.run_once().await {
                Ok(IterationOutcome::Idle) => true,
                Ok(outcome @ IterationOutcome::CapacityExhausted { .. }) => {
                    debug!(?outcome, "batch iteration finished");
                    true
                }
                Ok(outcome) => {
                    debug!(?outcome, queued = self.queue.len(), "batch iteration finished");
                    self.queue.is_empty()
                }
                Err(e) => {
                    error!("batch iteration failed: {e}");
                    true
                }
            };
        }
        info!("batch processor stopped");
    }

    /// Run a single iteration.
    ///
    /// Errors are returned only from before Fill, when no task has been
    /// drained. Later failures settle the batch and report
    /// [`IterationOutcome::Failed`].
    pub async fn run_once(&self) -> Result<IterationOutcome, StoreError> {
        if self.queue.is_empty() {
            return Ok(IterationOutcome::Idle);
        }

        let current = self.allocator.current_branch(self.metadata.as_ref()).await?;
        let mut branch = self.allocator.select_branch(current, false);
        let mut tasks = self.queue.drain(self.allocator.remaining(&branch));
        if tasks.is_empty() {
            branch = self.allocator.select_branch(branch, true);
            tasks = self.queue.drain(self.allocator.capacity());
        }
        if tasks.is_empty() {
            let head_size = self.queue.head_size().unwrap_or(0);
            warn!(
                head_size,
                capacity = self.allocator.capacity(),
                "queued asset exceeds branch capacity; it will never be committed"
            );
            return Ok(IterationOutcome::CapacityExhausted { head_size });
        }

        let drained = tasks.len();
        let tasks = match self.settle_durable(tasks).await {
            Ok(tasks) => tasks,
            Err((hashes, failure)) => {
                self.fail(branch.id, &hashes, failure);
                return Ok(IterationOutcome::Failed {
                    branch: branch.id,
                    stage: BatchStage::Lookup,
                });
            }
        };
        if tasks.is_empty() {
            return Ok(IterationOutcome::AlreadyDurable { assets: drained });
        }

        let hashes: Vec<ContentDigest> = tasks.iter().map(|t| t.hash).collect();
        match self.commit_batch(branch, &tasks).await {
            Ok(bytes) => Ok(IterationOutcome::Committed {
                branch: branch.id,
                assets: tasks.len(),
                bytes,
            }),
            Err(failure) => {
                let stage = failure.stage;
                self.fail(branch.id, &hashes, failure);
                Ok(IterationOutcome::Failed {
                    branch: branch.id,
                    stage,
                })
            }
        }
    }

    /// Resolve drained tasks whose content was committed by an earlier
    /// batch, and return the rest.
    async fn settle_durable(
        &self,
        tasks: Vec<PendingTask>,
    ) -> Result<Vec<PendingTask>, (Vec<ContentDigest>, BatchFailure)> {
        let mut fresh = Vec::with_capacity(tasks.len());
        for (idx, task) in tasks.iter().enumerate() {
            match self.metadata.find_by_hash(&task.hash).await {
                Ok(Some(record)) => {
                    let url = self.mirror.url_for(&record);
                    self.queue.resolve(&task.hash, &url);
                    if let Err(e) = self.scratch.remove(&task.hash).await {
                        warn!(hash = %task.hash, "failed to remove scratch file: {e}");
                    }
                    debug!(hash = %task.hash, "task already durable");
                }
                Ok(None) => fresh.push(task.clone()),
                Err(e) => {
                    let unsettled = fresh
                        .iter()
                        .chain(&tasks[idx..])
                        .map(|t: &PendingTask| t.hash)
                        .collect();
                    return Err((unsettled, BatchFailure::new(BatchStage::Lookup, e)));
                }
            }
        }
        Ok(fresh)
    }

    /// Checkout, write, commit, push, persist and settle one batch.
    /// Returns the committed byte count.
    async fn commit_batch(&self, branch: Branch, tasks: &[PendingTask]) -> Result<u64, BatchFailure> {
        let name = branch.id.name();
        info!(branch = %name, assets = tasks.len(), fresh = branch.is_fresh(), "committing batch");

        let checkout = if branch.is_fresh() {
            self.gateway.checkout_orphan(branch.id).await
        } else {
            self.gateway
                .checkout_existing(branch.id, self.fetch_before_write, self.reset_to_remote)
                .await
        };
        checkout.map_err(|e| BatchFailure::new(BatchStage::Checkout, e))?;

        let work_dir = self.gateway.work_dir().to_path_buf();
        let mut paths = Vec::with_capacity(tasks.len());
        for task in tasks {
            let rel = PathBuf::from(asset_path(&task.hash, &task.name));
            ScratchSpace::move_into(&task.scratch_path, &work_dir.join(&rel))
                .await
                .map_err(|e| BatchFailure::new(BatchStage::Move, e))?;
            paths.push(rel);
        }

        self.gateway
            .stage(&paths)
            .await
            .map_err(|e| BatchFailure::new(BatchStage::Stage, e))?;
        let message = format!("upload {} asset(s) to {}", tasks.len(), name);
        self.gateway
            .commit(&message)
            .await
            .map_err(|e| BatchFailure::new(BatchStage::Commit, e))?;
        self.gateway
            .push(branch.id)
            .await
            .map_err(|e| BatchFailure::new(BatchStage::Push, e))?;

        let new_records: Vec<NewAssetRecord> = tasks
            .iter()
            .map(|t| NewAssetRecord {
                hash: t.hash,
                name: t.name.clone(),
                size: t.size,
                branch: branch.id,
            })
            .collect();
        let records = self
            .metadata
            .upsert(&new_records)
            .await
            .map_err(|e| BatchFailure::new(BatchStage::Persist, e))?;

        let by_hash: HashMap<ContentDigest, String> = records
            .iter()
            .map(|r| (r.hash, self.mirror.url_for(r)))
            .collect();
        let mut bytes = 0u64;
        for task in tasks {
            bytes += task.size;
            match by_hash.get(&task.hash) {
                Some(url) => {
                    self.queue.resolve(&task.hash, url);
                }
                None => {
                    self.queue.reject(
                        std::slice::from_ref(&task.hash),
                        &BatchFailure::new(BatchStage::Persist, "record missing after upsert"),
                    );
                }
            }
        }
        info!(branch = %name, assets = tasks.len(), bytes, "batch committed");
        Ok(bytes)
    }

    fn fail(&self, branch: BranchId, hashes: &[ContentDigest], failure: BatchFailure) {
        error!(
            branch = %branch,
            stage = %failure.stage,
            assets = hashes.len(),
            "batch failed: {}",
            failure.message
        );
        self.queue.reject(hashes, &failure);
    }
}

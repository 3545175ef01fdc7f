//! # Task Queue
//!
//! Admission point between concurrent uploads and the single batch loop.
//!
//! ## Invariants
//!
//! - At most one task exists per content hash, from admission until it is
//!   settled. Later uploads of the same hash attach to it as extra waiters.
//! - Tasks leave the queue in FIFO order. [`TaskQueue::drain`] stops at the
//!   first task that does not fit the byte budget, even if later, smaller
//!   tasks would.
//! - A drained task stays indexed (in flight) until [`TaskQueue::resolve`]
//!   or [`TaskQueue::reject`] settles it, so uploads arriving mid-batch
//!   still attach instead of starting a duplicate.
//! - Every waiter of a task receives the same outcome.
//!
//! The inner mutex is never held across an `.await`.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use gitcas_core::{AssetName, ContentDigest};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{BatchFailure, StoreError};

type Settlement = Result<String, BatchFailure>;

/// An admitted upload waiting for its batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTask {
    pub hash: ContentDigest,
    pub name: AssetName,
    pub size: u64,
    /// Where the content waits until it is moved into the working copy.
    pub scratch_path: PathBuf,
}

/// Handle on a task's eventual outcome.
#[derive(Debug)]
pub struct Waiter {
    rx: oneshot::Receiver<Settlement>,
}

impl Waiter {
    /// Wait for the task to settle and return its public URL.
    pub async fn wait(self) -> Result<String, StoreError> {
        match self.rx.await {
            Ok(Ok(url)) => Ok(url),
            Ok(Err(failure)) => Err(StoreError::Batch(failure)),
            Err(_) => Err(StoreError::Inactive),
        }
    }
}

#[derive(Debug)]
struct TaskEntry {
    task: PendingTask,
    waiters: Vec<oneshot::Sender<Settlement>>,
    in_flight: bool,
}

impl TaskEntry {
    fn waiter(&mut self) -> Waiter {
        let (tx, rx) = oneshot::channel();
        self.waiters.push(tx);
        Waiter { rx }
    }

    fn settle(self, outcome: &Settlement) -> usize {
        let n = self.waiters.len();
        for tx in self.waiters {
            // A caller that stopped waiting is not an error.
            let _ = tx.send(outcome.clone());
        }
        n
    }
}

#[derive(Debug, Default)]
struct QueueInner {
    order: VecDeque<ContentDigest>,
    tasks: HashMap<ContentDigest, TaskEntry>,
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    inner: Mutex<QueueInner>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a waiter to a queued or in-flight task for `hash`.
    pub fn attach(&self, hash: &ContentDigest) -> Option<Waiter> {
        self.inner.lock().tasks.get_mut(hash).map(TaskEntry::waiter)
    }

    /// Admit a task, or attach to the existing one with the same hash.
    pub fn enqueue(&self, task: PendingTask) -> Waiter {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.tasks.get_mut(&task.hash) {
            return entry.waiter();
        }
        let hash = task.hash;
        let mut entry = TaskEntry {
            task,
            waiters: Vec::new(),
            in_flight: false,
        };
        let waiter = entry.waiter();
        inner.order.push_back(hash);
        inner.tasks.insert(hash, entry);
        waiter
    }

    /// Take tasks from the front while their summed size fits `budget`.
    pub fn drain(&self, budget: u64) -> Vec<PendingTask> {
        let mut inner = self.inner.lock();
        let QueueInner { order, tasks } = &mut *inner;
        let mut used = 0u64;
        let mut out = Vec::new();
        while let Some(hash) = order.front() {
            let Some(entry) = tasks.get_mut(hash) else {
                // Settled out of band; its slot is stale.
                order.pop_front();
                continue;
            };
            let next = used.saturating_add(entry.task.size);
            if next > budget {
                break;
            }
            used = next;
            entry.in_flight = true;
            out.push(entry.task.clone());
            order.pop_front();
        }
        out
    }

    /// Resolve every waiter of `hash` with `url`. Returns the waiter count.
    pub fn resolve(&self, hash: &ContentDigest, url: &str) -> usize {
        self.settle(std::slice::from_ref(hash), &Ok(url.to_string()))
    }

    /// Reject every waiter of the given tasks with one shared failure.
    pub fn reject(&self, hashes: &[ContentDigest], failure: &BatchFailure) -> usize {
        self.settle(hashes, &Err(failure.clone()))
    }

    /// Reject every task, queued or in flight.
    pub fn reject_all(&self, failure: &BatchFailure) -> usize {
        let entries: Vec<TaskEntry> = {
            let mut inner = self.inner.lock();
            inner.order.clear();
            inner.tasks.drain().map(|(_, entry)| entry).collect()
        };
        let outcome = Err(failure.clone());
        entries.into_iter().map(|e| e.settle(&outcome)).sum()
    }

    fn settle(&self, hashes: &[ContentDigest], outcome: &Settlement) -> usize {
        let entries: Vec<TaskEntry> = {
            let mut inner = self.inner.lock();
            let removed: Vec<TaskEntry> =
                hashes.iter().filter_map(|h| inner.tasks.remove(h)).collect();
            if removed.iter().any(|e| !e.in_flight) {
                let tasks = &inner.tasks;
                let keep: VecDeque<ContentDigest> = inner
                    .order
                    .iter()
                    .copied()
                    .filter(|h| tasks.contains_key(h))
                    .collect();
                inner.order = keep;
            }
            removed
        };
        entries.into_iter().map(|e| e.settle(outcome)).sum()
    }

    /// Number of tasks waiting to be drained.
    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of drained tasks not yet settled.
    pub fn in_flight(&self) -> usize {
        self.inner
            .lock()
            .tasks
            .values()
            .filter(|e| e.in_flight)
            .count()
    }

    /// Summed size of the tasks waiting to be drained.
    pub fn queued_bytes(&self) -> u64 {
        let inner = self.inner.lock();
        inner
            .order
            .iter()
            .filter_map(|h| inner.tasks.get(h))
            .map(|e| e.task.size)
            .sum()
    }

    /// Size of the task at the front of the queue.
    pub fn head_size(&self) -> Option<u64> {
        let inner = self.inner.lock();
        inner
            .order
            .front()
            .and_then(|h| inner.tasks.get(h))
            .map(|e| e.task.size)
    }

    /// Whether a queued or in-flight task exists for `hash`.
    pub fn contains(&self, hash: &ContentDigest) -> bool {
        self.inner.lock().tasks.contains_key(hash)
    }

    /// Number of callers waiting on `hash`.
    pub fn waiter_count(&self, hash: &ContentDigest) -> usize {
        self.inner
            .lock()
            .tasks
            .get(hash)
            .map_or(0, |e| e.waiters.len())
    }
}

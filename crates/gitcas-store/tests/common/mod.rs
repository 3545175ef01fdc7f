//! Shared fixtures: a recording in-process gateway and store builders.

#![allow(dead_code)]

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gitcas_core::{AssetName, BranchId, ContentDigest, MirrorConfig, NewAssetRecord};
use gitcas_git::{GitError, RepoGateway};
use gitcas_store::{
    AssetStore, HttpFetcher, MemoryMetadataStore, MetadataStore, StoreConfig, StoreError,
};
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// One gateway call, as observed by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Orphan(BranchId),
    Existing {
        branch: BranchId,
        fetch: bool,
        reset: bool,
    },
    Stage(Vec<PathBuf>),
    Commit(String),
    Push(BranchId),
}

/// Gateway that records calls and writes nothing beyond what the store
/// moves into its working directory.
pub struct FakeGateway {
    dir: PathBuf,
    calls: Mutex<Vec<Call>>,
    fail_push: AtomicBool,
}

impl FakeGateway {
    pub fn new(dir: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            dir: dir.into(),
            calls: Mutex::new(Vec::new()),
            fail_push: AtomicBool::new(false),
        })
    }

    pub fn fail_pushes(&self, fail: bool) {
        self.fail_push.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn commits(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Commit(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl RepoGateway for FakeGateway {
    fn work_dir(&self) -> &Path {
        &self.dir
    }

    async fn checkout_orphan(&self, branch: BranchId) -> Result<(), GitError> {
        self.record(Call::Orphan(branch));
        Ok(())
    }

    async fn checkout_existing(
        &self,
        branch: BranchId,
        fetch: bool,
        reset: bool,
    ) -> Result<(), GitError> {
        self.record(Call::Existing {
            branch,
            fetch,
            reset,
        });
        Ok(())
    }

    async fn stage(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        self.record(Call::Stage(paths.to_vec()));
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<(), GitError> {
        self.record(Call::Commit(message.to_string()));
        Ok(())
    }

    async fn push(&self, branch: BranchId) -> Result<(), GitError> {
        self.record(Call::Push(branch));
        if self.fail_push.load(Ordering::SeqCst) {
            return Err(GitError::CommandFailed {
                command: format!("push -q -f -u origin {branch}"),
                status: "exit status: 1".into(),
                stderr: "remote rejected".into(),
            });
        }
        Ok(())
    }
}

/// A store over in-memory metadata, plus the pieces tests inspect.
pub struct Harness {
    pub store: Arc<AssetStore>,
    pub metadata: Arc<MemoryMetadataStore>,
    pub gateway: Arc<FakeGateway>,
    pub tmp: TempDir,
}

impl Harness {
    pub fn new(capacity: u64) -> Self {
        Self::with_config(|cfg| cfg.branch_capacity = capacity)
    }

    pub fn with_config(adjust: impl FnOnce(&mut StoreConfig)) -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut config = StoreConfig::new(MirrorConfig::new("u", "r"));
        config.scratch_dir = tmp.path().join("scratch");
        config.flush_interval = Duration::from_millis(20);
        adjust(&mut config);

        let metadata = Arc::new(MemoryMetadataStore::new());
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).expect("fetcher");
        let store = Arc::new(AssetStore::new(
            config,
            metadata.clone() as Arc<dyn MetadataStore>,
            fetcher,
        ));
        let work = tmp.path().join("work");
        std::fs::create_dir_all(&work).expect("work dir");
        let gateway = FakeGateway::new(work);
        Self {
            store,
            metadata,
            gateway,
            tmp,
        }
    }

    /// Seed a durable record as if an earlier batch had committed it.
    pub async fn seed(&self, tag: &str, size: u64, branch: u64) {
        self.metadata
            .upsert(&[NewAssetRecord {
                hash: ContentDigest::of(tag.as_bytes()),
                name: AssetName::new(tag).expect("name"),
                size,
                branch: BranchId::new(branch),
            }])
            .await
            .expect("seed");
    }

    /// Start an upload of `bytes` in the background.
    pub fn spawn_upload(
        &self,
        bytes: Vec<u8>,
        name: &str,
    ) -> JoinHandle<Result<String, StoreError>> {
        let store = self.store.clone();
        let name = name.to_string();
        tokio::spawn(async move { store.upload_bytes(bytes, Some(&name)).await })
    }

    /// Run one batch iteration against the fake gateway.
    pub async fn run_once(&self) -> gitcas_store::IterationOutcome {
        self.store
            .processor(self.gateway.clone())
            .run_once()
            .await
            .expect("iteration")
    }
}

/// Poll `cond` until it holds, failing the test after two seconds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Await a spawned upload with a timeout.
pub async fn settle<T>(handle: impl Future<Output = Result<T, tokio::task::JoinError>>) -> T {
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("upload did not settle")
        .expect("upload task panicked")
}

pub fn filler(tag: u8, size: usize) -> Vec<u8> {
    let mut bytes = vec![tag; size];
    if let Some(first) = bytes.first_mut() {
        *first = tag.wrapping_add(1);
    }
    bytes
}

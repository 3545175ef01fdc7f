//! Wiring shared by the subcommands that need a live store.

use std::sync::Arc;

use anyhow::Context;
use gitcas_git::{GitCli, RepoGateway};
use gitcas_store::{
    git_config_from_env, init_pool, AssetStore, HttpFetcher, MemoryMetadataStore, MetadataStore,
    PgMetadataStore, StoreConfig,
};

/// Pick the metadata backend: Postgres when `DATABASE_URL` is set,
/// in-memory otherwise.
pub async fn open_metadata() -> anyhow::Result<Arc<dyn MetadataStore>> {
    let metadata: Arc<dyn MetadataStore> = match init_pool()
        .await
        .context("connecting to the metadata database")?
    {
        Some(pool) => Arc::new(PgMetadataStore::new(pool)),
        None => Arc::new(MemoryMetadataStore::new()),
    };
    Ok(metadata)
}

/// Build an inactive store from `GITCAS_*` environment variables.
pub async fn open_store() -> anyhow::Result<AssetStore> {
    let config = StoreConfig::from_env().context("loading store configuration")?;
    let fetcher = HttpFetcher::new(config.fetch_timeout).context("building HTTP client")?;
    let metadata = open_metadata().await?;
    tracing::debug!(
        capacity = config.branch_capacity,
        offset = config.branch_offset,
        scratch = %config.scratch_dir.display(),
        "store configured"
    );
    Ok(AssetStore::new(config, metadata, fetcher))
}

/// Open (or initialize) the git working copy named by `GITCAS_REPO_DIR`.
pub async fn open_gateway() -> anyhow::Result<Arc<dyn RepoGateway>> {
    let config = git_config_from_env().context("loading git configuration")?;
    let work_dir = config.work_dir.clone();
    let git = GitCli::open(config)
        .await
        .with_context(|| format!("opening working copy at {}", work_dir.display()))?;
    Ok(Arc::new(git))
}

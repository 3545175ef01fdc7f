//! Store configuration.
//!
//! Loaded from `GITCAS_*` environment variables with defaults, or built
//! directly with [`StoreConfig::new`] for tests and embedding.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use gitcas_core::{MirrorConfig, DEFAULT_MIRROR_BASE};
use gitcas_git::GitConfig;

/// Default per-branch byte capacity: 50 MiB.
pub const DEFAULT_BRANCH_CAPACITY: u64 = 50 * 1024 * 1024;

/// Default step between consecutive branch ids.
pub const DEFAULT_BRANCH_OFFSET: u64 = 1;

/// Default pause between batch iterations.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

/// Default timeout for remote source downloads.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for an [`AssetStore`](crate::AssetStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Where committed branches are publicly served from.
    pub mirror: MirrorConfig,
    /// Maximum summed asset size per branch, in bytes.
    pub branch_capacity: u64,
    /// Step added to the current branch id on rollover.
    pub branch_offset: u64,
    /// Pause between batch iterations.
    pub flush_interval: Duration,
    /// Where uploaded content waits until its batch is committed.
    pub scratch_dir: PathBuf,
    /// Fetch the remote branch before appending to it.
    pub fetch_before_write: bool,
    /// Hard-reset the local branch to the fetched remote tip.
    pub reset_to_remote: bool,
    /// Timeout for downloading remote sources.
    pub fetch_timeout: Duration,
}

impl StoreConfig {
    /// Configuration with every default except the mirror.
    pub fn new(mirror: MirrorConfig) -> Self {
        Self {
            mirror,
            branch_capacity: DEFAULT_BRANCH_CAPACITY,
            branch_offset: DEFAULT_BRANCH_OFFSET,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            scratch_dir: default_scratch_dir(),
            fetch_before_write: true,
            reset_to_remote: true,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `GITCAS_MIRROR_BASE` (default: `https://cdn.jsdelivr.net/gh`)
    /// - `GITCAS_MIRROR_USER` (required)
    /// - `GITCAS_MIRROR_REPO` (required)
    /// - `GITCAS_BRANCH_CAPACITY` (default: 52428800)
    /// - `GITCAS_BRANCH_OFFSET` (default: 1)
    /// - `GITCAS_FLUSH_INTERVAL_SECS` (default: 10)
    /// - `GITCAS_SCRATCH_DIR` (default: `$TMPDIR/gitcas/scratch`)
    /// - `GITCAS_FETCH_BEFORE_WRITE` (default: true)
    /// - `GITCAS_RESET_TO_REMOTE` (default: true)
    /// - `GITCAS_FETCH_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let user = required("GITCAS_MIRROR_USER")?;
        let repo = required("GITCAS_MIRROR_REPO")?;
        let base = std::env::var("GITCAS_MIRROR_BASE")
            .unwrap_or_else(|_| DEFAULT_MIRROR_BASE.to_string());

        let offset = env_parse("GITCAS_BRANCH_OFFSET", DEFAULT_BRANCH_OFFSET)?;
        if offset == 0 {
            return Err(ConfigError::Invalid {
                var: "GITCAS_BRANCH_OFFSET".into(),
                value: "0".into(),
            });
        }

        Ok(Self {
            mirror: MirrorConfig::new(user, repo).with_base(base),
            branch_capacity: env_parse("GITCAS_BRANCH_CAPACITY", DEFAULT_BRANCH_CAPACITY)?,
            branch_offset: offset,
            flush_interval: Duration::from_secs(env_parse(
                "GITCAS_FLUSH_INTERVAL_SECS",
                DEFAULT_FLUSH_INTERVAL.as_secs(),
            )?),
            scratch_dir: std::env::var_os("GITCAS_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_scratch_dir),
            fetch_before_write: env_bool("GITCAS_FETCH_BEFORE_WRITE", true)?,
            reset_to_remote: env_bool("GITCAS_RESET_TO_REMOTE", true)?,
            fetch_timeout: Duration::from_secs(env_parse(
                "GITCAS_FETCH_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT.as_secs(),
            )?),
        })
    }
}

/// Load the working copy configuration from environment variables.
///
/// Variables:
/// - `GITCAS_REPO_DIR` (default: `$TMPDIR/gitcas/repo`)
/// - `GITCAS_REMOTE` (default: `origin`)
/// - `GITCAS_REMOTE_URL` (optional; registered on first init)
/// - `GITCAS_AUTHOR_NAME` (default: `gitcas`)
/// - `GITCAS_AUTHOR_EMAIL` (default: `gitcas@localhost`)
pub fn git_config_from_env() -> Result<GitConfig, ConfigError> {
    let work_dir = std::env::var_os("GITCAS_REPO_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("gitcas").join("repo"));
    let mut config = GitConfig::new(work_dir);
    if let Ok(remote) = std::env::var("GITCAS_REMOTE") {
        config.remote = non_empty("GITCAS_REMOTE", remote)?;
    }
    if let Ok(url) = std::env::var("GITCAS_REMOTE_URL") {
        config = config.with_remote_url(non_empty("GITCAS_REMOTE_URL", url)?);
    }
    if let Ok(name) = std::env::var("GITCAS_AUTHOR_NAME") {
        config.author_name = non_empty("GITCAS_AUTHOR_NAME", name)?;
    }
    if let Ok(email) = std::env::var("GITCAS_AUTHOR_EMAIL") {
        config.author_email = non_empty("GITCAS_AUTHOR_EMAIL", email)?;
    }
    Ok(config)
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("gitcas").join("scratch")
}

fn required(var: &str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Missing(var.to_string())),
    }
}

fn non_empty(var: &str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid {
            var: var.to_string(),
            value,
        });
    }
    Ok(value.trim().to_string())
}

fn env_parse<T: FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

fn env_bool(var: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                var: var.to_string(),
                value: raw,
            }),
        },
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(String),
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: String, value: String },
}

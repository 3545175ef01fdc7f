//! # Url Subcommand
//!
//! Computes the public mirror URL of an asset from its hash, name and
//! branch. Reads no state beyond the mirror settings.

use anyhow::{bail, Context};
use clap::Args;
use gitcas_core::{public_url, AssetName, BranchId, ContentDigest, MirrorConfig, DEFAULT_MIRROR_BASE};

/// Arguments for the url subcommand.
#[derive(Args, Debug)]
pub struct UrlArgs {
    /// Hex SHA-256 of the asset.
    #[arg(long)]
    pub hash: String,

    /// Stored file name.
    #[arg(long)]
    pub name: String,

    /// Eight-character branch name, e.g. `0000000a`.
    #[arg(long)]
    pub branch: String,

    /// Mirror user. Defaults to `GITCAS_MIRROR_USER`.
    #[arg(long)]
    pub user: Option<String>,

    /// Mirror repository. Defaults to `GITCAS_MIRROR_REPO`.
    #[arg(long)]
    pub repo: Option<String>,

    /// Mirror base URL. Defaults to `GITCAS_MIRROR_BASE` or jsDelivr.
    #[arg(long)]
    pub base: Option<String>,
}

pub fn run_url(args: &UrlArgs) -> anyhow::Result<u8> {
    println!("{}", build_url(args)?);
    Ok(0)
}

pub fn build_url(args: &UrlArgs) -> anyhow::Result<String> {
    let hash = ContentDigest::from_hex(&args.hash).context("invalid --hash")?;
    let name = AssetName::new(&args.name).context("invalid --name")?;
    let branch = BranchId::parse(&args.branch).context("invalid --branch")?;
    let mirror = resolve_mirror(args)?;
    Ok(public_url(&mirror, branch, &hash, &name))
}

fn resolve_mirror(args: &UrlArgs) -> anyhow::Result<MirrorConfig> {
    let pick = |flag: &Option<String>, var: &str| {
        flag.clone()
            .or_else(|| std::env::var(var).ok().filter(|v| !v.is_empty()))
    };
    let Some(user) = pick(&args.user, "GITCAS_MIRROR_USER") else {
        bail!("mirror user not given: pass --user or set GITCAS_MIRROR_USER");
    };
    let Some(repo) = pick(&args.repo, "GITCAS_MIRROR_REPO") else {
        bail!("mirror repository not given: pass --repo or set GITCAS_MIRROR_REPO");
    };
    let base = pick(&args.base, "GITCAS_MIRROR_BASE")
        .unwrap_or_else(|| DEFAULT_MIRROR_BASE.to_string());
    Ok(MirrorConfig::new(user, repo).with_base(base))
}

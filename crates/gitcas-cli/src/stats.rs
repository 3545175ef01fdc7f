//! # Stats Subcommand

use anyhow::Context;
use clap::Args;

use crate::bootstrap::open_metadata;

/// Arguments for the stats subcommand.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Print compact JSON on one line.
    #[arg(long)]
    pub compact: bool,
}

pub async fn run_stats(args: &StatsArgs) -> anyhow::Result<u8> {
    let metadata = open_metadata().await?;
    let stats = metadata.stats().await.context("reading statistics")?;
    let out = if args.compact {
        serde_json::to_string(&stats)?
    } else {
        serde_json::to_string_pretty(&stats)?
    };
    println!("{out}");
    Ok(0)
}

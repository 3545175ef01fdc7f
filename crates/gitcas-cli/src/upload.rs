//! # Upload Subcommand
//!
//! One-shot upload: starts a store, waits for the asset's batch to be
//! pushed, prints the public URL, and shuts down.

use anyhow::Context;
use clap::Args;

use crate::bootstrap::{open_gateway, open_store};

/// Arguments for the upload subcommand.
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// `http(s)://…`, `data:…` or `base64://…` source.
    pub source: String,

    /// File name to store the asset under. Inferred from content if omitted.
    #[arg(long)]
    pub name: Option<String>,
}

pub async fn run_upload(args: &UploadArgs) -> anyhow::Result<u8> {
    let store = open_store().await?;
    let gateway = open_gateway().await?;
    store.activate(gateway).context("starting batch processor")?;

    let result = store.upload(&args.source, args.name.as_deref()).await;
    store.deactivate().await;

    let url = result.context("upload failed")?;
    println!("{url}");
    Ok(0)
}

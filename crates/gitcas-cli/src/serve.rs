//! # Serve Subcommand
//!
//! Runs the HTTP API until Ctrl-C, then stops the batch loop so every
//! pending upload is answered before the process exits.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use gitcas_api::AppState;

use crate::bootstrap::{open_gateway, open_store};

/// Arguments for the serve subcommand.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on.
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: std::net::IpAddr,
}

pub async fn run_serve(args: &ServeArgs) -> anyhow::Result<u8> {
    let store = Arc::new(open_store().await?);
    let gateway = open_gateway().await?;
    store.activate(gateway).context("starting batch processor")?;

    let app = gitcas_api::app(AppState::new(store.clone()));
    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("gitcas listening on {addr}");

    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    store.deactivate().await;
    tracing::info!("batch processor stopped");
    served.context("server error")?;
    Ok(0)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

//! # gitcas CLI entry point
//!
//! Parses command-line arguments, sets up logging, and dispatches to the
//! subcommand handlers in the library crate.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gitcas_cli::serve::{run_serve, ServeArgs};
use gitcas_cli::stats::{run_stats, StatsArgs};
use gitcas_cli::upload::{run_upload, UploadArgs};
use gitcas_cli::url::{run_url, UrlArgs};

/// gitcas: content-addressed asset storage on git branches.
///
/// Uploaded assets are batched into commits on size-bounded branches and
/// served from the public git mirror.
#[derive(Parser, Debug)]
#[command(name = "gitcas", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API and run the batch processor.
    Serve(ServeArgs),

    /// Upload one asset and print its public URL.
    Upload(UploadArgs),

    /// Print asset statistics as JSON.
    Stats(StatsArgs),

    /// Print the public URL for a hash, name and branch.
    Url(UrlArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let result = match &cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Upload(args) => run_upload(args).await,
        Commands::Stats(args) => run_stats(args).await,
        Commands::Url(args) => run_url(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

/// `RUST_LOG` wins when set; otherwise the `-v` count picks the level.
fn init_tracing(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn,gitcas=info",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

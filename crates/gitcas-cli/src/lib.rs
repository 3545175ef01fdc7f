//! # gitcas-cli: Command-Line Interface
//!
//! Argument parsing lives in `main.rs`; each subcommand module owns its
//! `clap::Args` struct and a `run_*` handler that delegates to the store.
//!
//! ## Subcommands
//!
//! - `serve`: run the HTTP API with the batch loop in the background
//! - `upload`: push one asset through a short-lived store and print its URL
//! - `stats`: print aggregate statistics as JSON
//! - `url`: compute a public URL without touching any state

pub mod bootstrap;
pub mod serve;
pub mod stats;
pub mod upload;
pub mod url;

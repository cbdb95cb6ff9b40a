//! Binary crate for the `weatherd` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments into service requests
//! - The interactive console and configuration prompts
//! - Human-friendly output formatting

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod console;
mod output;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr so stdout stays parseable with --json.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("weatherd=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let succeeded = cli::Cli::parse().run().await?;

    Ok(if succeeded { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

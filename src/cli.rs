use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "lucid",
    version,
    about = "List and prune containers, images and pods across Docker, Podman and OpenShift."
)]
pub struct CliArgs {
    /// Listing query, for example "backend=docker,podman resource=image"
    #[arg(short, long)]
    pub query: Option<String>,

    /// Configuration file (defaults to $LUCID_CONFIG, ./lucid.yaml, ~/.config/lucid/config.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Per-backend fetch timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// File receiving log output
    #[arg(long, default_value = "lucid.log")]
    pub log_file: PathBuf,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Print the listing with one-based row numbers
    List {
        /// Row width in characters
        #[arg(long, default_value_t = 100)]
        width: usize,
    },
    /// Print the raw payload of row N
    Inspect { position: usize },
    /// Remove row N, or rows N through M
    Delete { start: usize, end: Option<usize> },
}

pub const ONE_SHOT_WIDTH: usize = 100;

/// Converts one-based inclusive positions into the zero-based start and
/// exclusive end the engine expects.
pub fn positions_to_range(start: usize, end: Option<usize>) -> Result<(usize, Option<usize>)> {
    if start == 0 {
        bail!("row numbers start at 1");
    }
    match end {
        None => Ok((start - 1, None)),
        Some(end) if end < start => bail!("range end {end} is before start {start}"),
        Some(end) => Ok((start - 1, Some(end))),
    }
}

// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things). Doc comments on fields
// become the --help text.
// =============================================================================

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Default Seafile server; override with --base-url or SHARE_SCRAPER_BASE_URL
pub const DEFAULT_BASE_URL: &str = "https://seafile.rlp.net";

// #[derive(Parser)] tells clap to automatically generate parsing code
#[derive(Parser, Debug)]
#[command(
    name = "share-scraper",
    version,
    about = "Mirror a Seafile share link to a local directory, one file at a time",
    long_about = "share-scraper walks the directory listing of a public Seafile share and \
                  downloads every file individually, recreating the folder tree locally. \
                  It works around the server's size limit on ZIP downloads, and re-running it \
                  after an interruption skips files that are already on disk."
)]
pub struct Cli {
    /// Share token (the part after /d/ in the share link)
    ///
    /// Example: for https://seafile.rlp.net/d/abc123/ the token is abc123
    pub token: String,

    /// Directory to mirror the share into (created if missing)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Directory inside the share to start from
    #[arg(short, long, default_value = "/")]
    pub path: String,

    /// Base URL of the Seafile server
    #[arg(long, env = "SHARE_SCRAPER_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Overwrite files that already exist locally
    #[arg(short, long)]
    pub force: bool,

    /// Re-download existing files whose size differs from the server's
    #[arg(long, conflicts_with = "force")]
    pub verify_size: bool,

    /// Attempts per request before giving up on it
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    pub tries: u32,

    /// Seconds to wait between two attempts of the same request
    #[arg(long, default_value_t = 10)]
    pub retry_delay: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Pause after each directory listing, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub delay_ms: u64,

    /// Print the final report as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// More log output (-v debug, -vv trace); RUST_LOG overrides this
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Log filter used when RUST_LOG is not set
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

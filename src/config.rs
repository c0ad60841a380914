// src/config.rs
// =============================================================================
// Turns the parsed command line into the settings of one run.
//
// Everything that can be rejected without touching the network (a malformed
// base URL, an empty token) is rejected here.
// =============================================================================

use crate::cli::Cli;
use crate::download::DownloadOptions;
use crate::share::{normalize_remote_path, RetryPolicy, ShareUrls};
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub urls: ShareUrls,
    /// Local directory that mirrors `start_path`
    pub output: PathBuf,
    /// Remote directory the crawl starts from
    pub start_path: String,
    pub download: DownloadOptions,
    pub retry: RetryPolicy,
    pub timeout: Duration,
    pub listing_delay: Duration,
}

impl ScrapeConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Ok(Self {
            urls: ShareUrls::new(&cli.base_url, &cli.token)?,
            output: cli.output.clone(),
            start_path: normalize_remote_path(&cli.path),
            download: DownloadOptions {
                force: cli.force,
                verify_size: cli.verify_size,
            },
            retry: RetryPolicy {
                tries: cli.tries,
                delay: Duration::from_secs(cli.retry_delay),
            },
            timeout: Duration::from_secs(cli.timeout),
            listing_delay: Duration::from_millis(cli.delay_ms),
        })
    }
}

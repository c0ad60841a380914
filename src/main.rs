// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing) on stderr
// 3. Build the HTTP session and crawl the share
// 4. Print the report (table or JSON) on stdout
// 5. Exit with proper code (0 = crawl completed, 1 = share root unreachable,
//    2 = fatal error such as an unwritable output directory)
//
// The runtime is tokio's single-threaded flavor: the crawl makes one request
// at a time, so there is nothing to run in parallel.
// =============================================================================

mod cli;       // src/cli.rs - command-line parsing
mod config;    // src/config.rs - run settings built from the CLI
mod crawl;     // src/crawl/ - depth-first walk and the run report
mod download;  // src/download/ - streamed single-file downloads
mod error;     // src/error.rs - typed errors
mod listing;   // src/listing/ - listing page fetch + parse
mod share;     // src/share/ - share URLs and HTTP session

use anyhow::{anyhow, Result};
use clap::Parser;
use cli::Cli;
use config::ScrapeConfig;
use crawl::{CrawlReport, Crawler, DirectoryNode, FailureKind};
use error::CrawlError;
use listing::SeafileListing;
use share::ShareClient;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse CLI arguments first, so --help works without any logging set up
    let cli = Cli::parse();
    init_logging(&cli);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// RUST_LOG wins; otherwise -q / -v decide
fn init_logging(cli: &Cli) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.default_log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// Returns:
//   Ok(0) = crawl completed (possibly with per-file failures, see the report)
//   Ok(1) = the starting directory could not be listed
//   Err   = fatal error (exit code 2)
async fn run(cli: Cli) -> Result<i32> {
    let config = ScrapeConfig::from_cli(&cli)?;

    info!(
        token = config.urls.token(),
        path = %config.start_path,
        output = %config.output.display(),
        "mirroring share"
    );

    // One session for the whole run; cookies set by the server are kept
    let client = ShareClient::new(config.urls.clone(), config.retry.clone(), config.timeout)
        .map_err(|e| anyhow!("failed to build HTTP client: {}", e))?;
    let parser = SeafileListing::new();
    let crawler = Crawler::new(&client, &parser, config.download, config.listing_delay);
    let root = DirectoryNode::new(&config.start_path, config.output.clone());

    match crawler.run(root).await {
        Ok(report) => {
            print_report(&report, cli.json)?;
            Ok(0)
        }
        Err(e @ CrawlError::RootListing { .. }) => {
            error!("{}", e);
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

// Prints the report either as a summary table or JSON
fn print_report(report: &CrawlReport, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(report)?;
        println!("{}", json_output);
    } else {
        print_table(report);
    }
    Ok(())
}

// Human-readable report: failures first (they are what needs attention),
// then the totals
fn print_table(report: &CrawlReport) {
    if !report.failures.is_empty() {
        println!("{:<10} {:<50} {:<40}", "KIND", "REMOTE PATH", "MESSAGE");
        println!("{}", "=".repeat(100));

        for failure in &report.failures {
            let kind = match failure.kind {
                FailureKind::Listing => "LISTING",
                FailureKind::Download => "DOWNLOAD",
                FailureKind::Rejected => "REJECTED",
            };
            println!(
                "{:<10} {:<50} {:<40}",
                kind,
                truncate(&failure.remote_path, 50),
                failure.message
            );
        }

        println!();
    }

    println!("📊 Summary:");
    println!("   📁 Directories: {}", report.directories.len());
    println!(
        "   ✅ Downloaded: {} ({} bytes)",
        report.downloaded.len(),
        report.downloaded_bytes()
    );
    println!("   ⏭️  Skipped (already present): {}", report.skipped.len());
    println!(
        "   ❌ Failed: {} ({} directories, {} files, {} unusable names)",
        report.failures.len(),
        report.failures_of(FailureKind::Listing).count(),
        report.failures_of(FailureKind::Download).count(),
        report.failures_of(FailureKind::Rejected).count()
    );

    if report.is_complete() {
        println!("\n✅ Share mirrored completely");
    } else {
        println!("\n⚠️  Some entries could not be retrieved; run again to retry them");
    }
}

// Shortens long paths for the table, keeping the end (the file name)
fn truncate(text: &str, width: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= width {
        return text.to_string();
    }
    let tail: String = chars[chars.len() - (width - 3)..].iter().collect();
    format!("...{}", tail)
}

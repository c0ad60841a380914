// src/crawl/report.rs
// =============================================================================
// What happened during one crawl.
//
// The walk never stops for a single broken file or directory. Instead it
// writes every outcome into a `CrawlReport`, and main.rs prints the report
// (as a table or as JSON) when the crawl is over.
// =============================================================================

use crate::download::SkipReason;
use serde::Serialize;
use std::path::PathBuf;

/// Which step of the crawl failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A directory's listing could not be fetched or parsed; its subtree is missing
    Listing,
    /// A single file could not be downloaded
    Download,
    /// An entry's name cannot be used locally, so it was never fetched
    Rejected,
}

/// One directory or file that could not be retrieved
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    /// Path inside the share
    pub remote_path: String,
    /// Where it would have been written
    pub local_path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Everything the crawl did, in the order it did it
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    /// Local directories created (or found already present)
    pub directories: Vec<PathBuf>,
    pub downloaded: Vec<DownloadedFile>,
    pub skipped: Vec<SkippedFile>,
    pub failures: Vec<Failure>,
}

impl CrawlReport {
    /// True when every discovered directory and file was retrieved
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.downloaded.iter().map(|f| f.bytes).sum()
    }

    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &Failure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }
}

// src/error.rs
// =============================================================================
// Error types for the scraper.
//
// Three kinds of failure matter while mirroring a share, and each one is
// handled at a different level:
// - ParseError: a listing page did not look like a Seafile listing.
//   Only the subtree rooted at that page is lost.
// - DownloadError: one file could not be fetched. Only that file is lost.
// - FilesystemError: we could not write to disk. The whole run stops,
//   because carrying on would silently drop data.
//
// We use `thiserror` to derive Display and Error for these enums. The binary's
// top level (main.rs) still uses anyhow, which accepts all of them through `?`.
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

/// A listing page that did not match the expected Seafile markup.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Neither the entry table nor the empty-folder marker was found
    #[error("page at {url} has no entry table (markup changed or not a share listing?)")]
    MissingEntryTable { url: String },

    /// An entry row has an `a.normal` element without an href
    #[error("entry '{name}' on {url} has no link target")]
    MissingHref { url: String, name: String },

    /// The entry link could not be resolved against the page URL
    #[error("entry '{name}' on {url} has an invalid link '{href}'")]
    InvalidLink { url: String, name: String, href: String },

    /// The entry link has no `p=` query parameter to take the remote path from
    #[error("entry '{name}' on {url} has no path parameter in '{href}'")]
    MissingPath { url: String, name: String, href: String },
}

/// A GET request that never produced a usable response.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request itself failed (DNS, connect, timeout, TLS, ...)
    #[error("request to {url} failed after {attempts} attempt(s): {source}")]
    Network {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
}

/// Why a directory's listing could not be turned into entries.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("failed to read listing body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A single file that could not be fetched.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The connection dropped while the body was streaming
    #[error("download of {url} was interrupted: {source}")]
    Interrupted {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The body ended before Content-Length bytes arrived
    #[error("download of {url} is incomplete: expected {expected} bytes, got {received}")]
    Incomplete {
        url: String,
        expected: u64,
        received: u64,
    },
}

/// A local filesystem operation failed. Always fatal.
#[derive(Debug, Error)]
#[error("could not {action} {path}: {source}")]
pub struct FilesystemError {
    pub action: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl FilesystemError {
    pub fn new(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Outcome of a failed file step: either just this file, or the whole run.
#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Errors that end a crawl early.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The starting directory could not be listed, so nothing was mirrored
    #[error("could not list the share root '{path}': {source}")]
    RootListing {
        path: String,
        #[source]
        source: ListingError,
    },

    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

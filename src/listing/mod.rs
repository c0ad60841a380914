// src/listing/mod.rs
// =============================================================================
// This module turns a directory's listing page into entries.
//
// Submodules:
// - seafile: the CSS-selector parser for Seafile's "list" view. This is the
//   part that breaks when the server changes its markup, so it lives behind
//   the `ListingParser` trait and nothing else depends on selectors.
// - fetch: GETs a listing page through the share session and hands the body
//   to a parser.
//
// Rust concepts:
// - Traits: `ListingParser` lets the walk work with any parser implementation
// - Enums with data: `Entry` is either a directory or a file
// =============================================================================

mod fetch;
mod seafile;

pub use fetch::fetch_listing;
pub use seafile::SeafileListing;

use crate::error::ParseError;
use url::Url;

/// A subdirectory found on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Last component of the remote path; becomes the local directory name
    pub name: String,
    /// Path inside the share, used to request this directory's listing
    pub remote_path: String,
}

/// A file found on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Last component of the remote path; becomes the local file name
    pub name: String,
    /// Path inside the share (used for reporting)
    pub remote_path: String,
    /// Absolute URL that returns the file's bytes
    pub url: Url,
}

/// One row of a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Directory(DirectoryEntry),
    File(FileEntry),
}

/// A row that names an entry we cannot store locally (e.g. "..")
///
/// Only this entry is lost; the rest of the page is still usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    pub name: String,
    pub remote_path: String,
    pub reason: String,
}

/// The entries of one directory, in the order the page lists them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub entries: Vec<Entry>,
    pub rejected: Vec<RejectedEntry>,
}

impl ListingPage {
    pub fn directory_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, Entry::Directory(_)))
            .count()
    }

    pub fn file_count(&self) -> usize {
        self.entries.len() - self.directory_count()
    }
}

/// Parses the HTML of a listing page into entries
///
/// `page_url` is the URL the page was fetched from; relative links on the
/// page are resolved against it.
///
/// Implementations must fail with a `ParseError` when the page does not have
/// the expected shape, instead of returning an empty listing.
pub trait ListingParser {
    fn parse(&self, html: &str, page_url: &Url) -> Result<ListingPage, ParseError>;
}

// src/download/mod.rs
// =============================================================================
// This module saves single files from the share to disk.
//
// Submodules:
// - file: streamed download of one file with the skip-if-exists policy
// - testing: a misbehaving HTTP server for tests (test builds only)
// =============================================================================

mod file;
#[cfg(test)]
pub(crate) mod testing;

pub use file::{download_file, DownloadOptions, FileOutcome, SkipReason};

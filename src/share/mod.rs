// src/share/mod.rs
// =============================================================================
// This module knows how to talk to a Seafile share.
//
// Submodules:
// - urls: builds listing-page URLs from a share token and a remote path
// - client: the HTTP session (reqwest client + retry policy) used by every
//   request of a run
// =============================================================================

mod client;
mod urls;

pub use client::{RetryPolicy, ShareClient};
pub use urls::{normalize_remote_path, ShareUrls};

// src/crawl/mod.rs
// =============================================================================
// This module handles mirroring a whole share.
//
// Features:
// - Depth-first walk in listing order, starting from any directory
// - Local directories created only after their listing was fetched
// - Per-file and per-directory failures recorded, not fatal
// - Skip-if-exists downloads, so an interrupted run can simply be restarted
//
// Rust concepts:
// - Lifetimes: the crawler borrows the session and parser owned by main
// - Vec as a stack: for depth-first traversal without recursion
// =============================================================================

mod report;
mod walk;

pub use report::{CrawlReport, FailureKind};
pub use walk::{Crawler, DirectoryNode};

// src/download/file.rs
// =============================================================================
// Streams one file from the share to disk.
//
// How it works:
// 1. If `<dir>/<name>` already exists (and we are not forcing), skip it.
//    With `verify_size`, it is only skipped when its length matches the
//    Content-Length the server reports.
// 2. Otherwise GET the download URL and write the body chunk by chunk into
//    a uniquely named staging file in `<dir>`, so the whole file is never
//    held in memory.
// 3. When the body is complete, rename the staging file to the final name.
//
// Because of step 3, a file with the final name is always complete. That is
// what lets an interrupted run be resumed by simply starting it again.
// The staging file is created exclusively under a random name, so it can
// never replace a file that came from the share (think `notes.part` next to
// `notes`). If the download fails it is deleted when dropped.
//
// Errors are split in two:
// - network / HTTP problems -> DownloadError (only this file is lost)
// - disk problems           -> FilesystemError (the run must stop)
// =============================================================================

use crate::error::{DownloadError, FileError, FilesystemError};
use crate::listing::FileEntry;
use crate::share::ShareClient;
use futures::StreamExt;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;
use tempfile::Builder;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

// Staging files start with a dot so they stay out of the way in listings
const STAGING_PREFIX: &str = ".share-scraper-";

/// What to do with files that are already on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadOptions {
    /// Always download, replacing existing files
    pub force: bool,
    /// Re-download existing files whose size differs from the server's
    pub verify_size: bool,
}

/// Why a download was not performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A file with that name exists and sizes were not checked
    AlreadyExists,
    /// A file with that name exists and has the size the server reports
    SizeMatches,
}

/// Result of one successful file step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Downloaded { bytes: u64 },
    Skipped(SkipReason),
}

/// Downloads `entry` into `dest_dir`, honoring the skip policy
pub async fn download_file(
    client: &ShareClient,
    entry: &FileEntry,
    dest_dir: &Path,
    options: DownloadOptions,
) -> Result<FileOutcome, FileError> {
    let target = dest_dir.join(&entry.name);
    let existing_len = existing_file_len(&target).await?;

    if existing_len.is_some() && !options.force && !options.verify_size {
        debug!(path = %target.display(), "already exists, skipping");
        return Ok(FileOutcome::Skipped(SkipReason::AlreadyExists));
    }

    let response = client.get(&entry.url).await.map_err(DownloadError::from)?;
    let expected_len = response.content_length();

    if let Some(local_len) = existing_len {
        if !options.force {
            match expected_len {
                Some(remote_len) if remote_len != local_len => {
                    info!(
                        path = %target.display(),
                        local = local_len,
                        remote = remote_len,
                        "size differs from server, downloading again"
                    );
                }
                _ => {
                    debug!(path = %target.display(), "size matches, skipping");
                    return Ok(FileOutcome::Skipped(SkipReason::SizeMatches));
                }
            }
        }
    }

    // The staging file lives next to the target so the final rename stays
    // on one filesystem
    let (file, staged) = Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dest_dir)
        .map_err(|e| FilesystemError::new("create a file in", dest_dir, e))?
        .into_parts();
    let mut writer = BufWriter::new(File::from_std(file));

    let mut bytes: u64 = 0;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|source| DownloadError::Interrupted {
            url: entry.url.to_string(),
            source,
        })?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FilesystemError::new("write to", &*staged, e))?;
        bytes += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FilesystemError::new("write to", &*staged, e))?;
    drop(writer);

    if let Some(expected) = expected_len {
        if expected != bytes {
            return Err(DownloadError::Incomplete {
                url: entry.url.to_string(),
                expected,
                received: bytes,
            }
            .into());
        }
    }

    staged
        .persist(&target)
        .map_err(|e| FilesystemError::new("move finished download to", &target, e.error))?;

    info!(path = %target.display(), bytes, "downloaded");
    Ok(FileOutcome::Downloaded { bytes })
}

// Length of an existing regular file at `path`, or None if there is none
async fn existing_file_len(path: &Path) -> Result<Option<u64>, FilesystemError> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
        Ok(_) => Err(FilesystemError::new(
            "write file",
            path,
            std::io::Error::new(ErrorKind::AlreadyExists, "a directory is in the way"),
        )),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FilesystemError::new("inspect", path, e)),
    }
}

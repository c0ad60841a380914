// src/crawl/walk.rs
// =============================================================================
// This module walks a share's directory tree depth-first and mirrors it.
//
// How it works:
// 1. Put the starting directory on a stack
// 2. Pop an item:
//    - directory: fetch + parse its listing, create the local directory,
//      push its entries (in reverse, so they pop in listing order)
//    - file: download it into its parent's local directory
// 3. Repeat until the stack is empty
//
// Entries are handled in exactly the order the page lists them, and a
// directory's whole subtree is done before its next sibling starts.
//
// Failure policy:
// - root listing fails      -> CrawlError::RootListing (nothing to mirror)
// - other listing fails     -> recorded, that subtree is skipped
// - a file download fails   -> recorded, next entry
// - an entry has a bad name  -> recorded, its siblings still run
// - anything on local disk  -> CrawlError::Filesystem, the run stops
//
// Only one request is ever in flight: every step is awaited before the next.
// =============================================================================

use super::report::{CrawlReport, DownloadedFile, Failure, FailureKind, SkippedFile};
use crate::download::{download_file, DownloadOptions, FileOutcome};
use crate::error::{CrawlError, FileError, FilesystemError, ListingError};
use crate::listing::{fetch_listing, Entry, FileEntry, ListingPage, ListingParser};
use crate::share::{normalize_remote_path, ShareClient};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// A remote directory and the local directory that mirrors it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    pub remote_path: String,
    pub local_path: PathBuf,
}

impl DirectoryNode {
    pub fn new(remote_path: &str, local_path: impl Into<PathBuf>) -> Self {
        Self {
            remote_path: normalize_remote_path(remote_path),
            local_path: local_path.into(),
        }
    }
}

// One pending step of the walk
#[derive(Debug)]
enum Work {
    Directory(DirectoryNode),
    File { entry: FileEntry, dest: PathBuf },
}

/// Mirrors a share, one request at a time
pub struct Crawler<'a> {
    client: &'a ShareClient,
    parser: &'a dyn ListingParser,
    options: DownloadOptions,
    listing_delay: Duration,
}

impl<'a> Crawler<'a> {
    pub fn new(
        client: &'a ShareClient,
        parser: &'a dyn ListingParser,
        options: DownloadOptions,
        listing_delay: Duration,
    ) -> Self {
        Self {
            client,
            parser,
            options,
            listing_delay,
        }
    }

    /// Mirrors `root` and everything below it
    pub async fn run(&self, root: DirectoryNode) -> Result<CrawlReport, CrawlError> {
        let mut report = CrawlReport::default();
        let mut stack = Vec::new();

        // Track visited remote paths so a page linking back up cannot loop
        let mut visited = HashSet::new();
        visited.insert(visit_key(&root.remote_path));

        let page = self
            .list(&root)
            .await
            .map_err(|source| CrawlError::RootListing {
                path: root.remote_path.clone(),
                source,
            })?;
        self.enter(root, page, &mut stack, &mut report).await?;

        while let Some(work) = stack.pop() {
            match work {
                Work::Directory(node) => {
                    if !visited.insert(visit_key(&node.remote_path)) {
                        warn!(path = %node.remote_path, "directory listed twice, skipping");
                        continue;
                    }

                    match self.list(&node).await {
                        Ok(page) => self.enter(node, page, &mut stack, &mut report).await?,
                        Err(e) => {
                            warn!(path = %node.remote_path, error = %e, "could not list directory");
                            report.failures.push(Failure {
                                kind: FailureKind::Listing,
                                remote_path: node.remote_path,
                                local_path: node.local_path,
                                message: e.to_string(),
                            });
                        }
                    }
                }
                Work::File { entry, dest } => {
                    self.fetch_file(entry, dest, &mut report).await?;
                }
            }
        }

        info!(
            directories = report.directories.len(),
            downloaded = report.downloaded.len(),
            skipped = report.skipped.len(),
            failures = report.failures.len(),
            "crawl finished"
        );
        Ok(report)
    }

    async fn list(&self, node: &DirectoryNode) -> Result<ListingPage, ListingError> {
        info!(path = %node.remote_path, "listing");
        let result = fetch_listing(self.client, self.parser, &node.remote_path).await;

        // Polite crawling: small delay between listing requests
        if !self.listing_delay.is_zero() {
            tokio::time::sleep(self.listing_delay).await;
        }

        result
    }

    // Creates the local mirror of a successfully listed directory and
    // schedules its entries
    async fn enter(
        &self,
        node: DirectoryNode,
        page: ListingPage,
        stack: &mut Vec<Work>,
        report: &mut CrawlReport,
    ) -> Result<(), FilesystemError> {
        tokio::fs::create_dir_all(&node.local_path)
            .await
            .map_err(|e| FilesystemError::new("create directory", &node.local_path, e))?;
        report.directories.push(node.local_path.clone());

        for rejected in page.rejected {
            warn!(path = %rejected.remote_path, name = ?rejected.name, "skipping entry");
            report.failures.push(Failure {
                kind: FailureKind::Rejected,
                remote_path: rejected.remote_path,
                local_path: node.local_path.clone(),
                message: rejected.reason,
            });
        }

        for entry in page.entries.into_iter().rev() {
            let work = match entry {
                Entry::Directory(dir) => Work::Directory(DirectoryNode {
                    local_path: node.local_path.join(&dir.name),
                    remote_path: dir.remote_path,
                }),
                Entry::File(file) => Work::File {
                    entry: file,
                    dest: node.local_path.clone(),
                },
            };
            stack.push(work);
        }

        Ok(())
    }

    async fn fetch_file(
        &self,
        entry: FileEntry,
        dest: PathBuf,
        report: &mut CrawlReport,
    ) -> Result<(), FilesystemError> {
        let path = dest.join(&entry.name);

        match download_file(self.client, &entry, &dest, self.options).await {
            Ok(FileOutcome::Downloaded { bytes }) => {
                report.downloaded.push(DownloadedFile { path, bytes });
            }
            Ok(FileOutcome::Skipped(reason)) => {
                info!(path = %path.display(), ?reason, "skipped");
                report.skipped.push(SkippedFile { path, reason });
            }
            Err(FileError::Download(e)) => {
                warn!(path = %entry.remote_path, error = %e, "download failed");
                report.failures.push(Failure {
                    kind: FailureKind::Download,
                    remote_path: entry.remote_path,
                    local_path: path,
                    message: e.to_string(),
                });
            }
            Err(FileError::Filesystem(e)) => return Err(e),
        }

        Ok(())
    }
}

// "/docs" and "/docs/" are the same directory
fn visit_key(remote_path: &str) -> String {
    remote_path.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::testing::serve_cut_off_body;
    use crate::download::SkipReason;
    use crate::listing::SeafileListing;
    use crate::share::{RetryPolicy, ShareUrls};
    use std::path::Path;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // One row of a fake listing page: full remote path of a folder or file.
    // `Link` is a file row with a hand-written href.
    enum Row {
        Dir(&'static str),
        File(&'static str),
        Link { name: &'static str, href: String },
    }

    fn name_of(remote_path: &str) -> &str {
        remote_path.rsplit('/').next().unwrap_or(remote_path)
    }

    fn listing_html(rows: &[Row]) -> String {
        let mut html = String::from("<table><tr><th>Name</th><th>Size</th></tr>");
        for row in rows {
            match row {
                Row::Dir(p) => html.push_str(&format!(
                    r#"<tr><td><a class="normal" href="/d/abc123/?p={}&mode=list">{}</a></td></tr>"#,
                    p,
                    name_of(p)
                )),
                Row::File(p) => html.push_str(&format!(
                    r#"<tr class="file-item"><td><a class="normal" href="/d/abc123/files/?p={}">{}</a></td></tr>"#,
                    p,
                    name_of(p)
                )),
                Row::Link { name, href } => html.push_str(&format!(
                    r#"<tr class="file-item"><td><a class="normal" href="{}">{}</a></td></tr>"#,
                    href, name
                )),
            }
        }
        html.push_str("</table>");
        html
    }

    async fn mount_listing(server: &MockServer, remote_path: &str, body: String) {
        Mock::given(method("GET"))
            .and(path("/d/abc123/"))
            .and(query_param("p", remote_path))
            .and(query_param("mode", "list"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    async fn mount_file(server: &MockServer, remote_path: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path("/d/abc123/files/"))
            .and(query_param("p", remote_path))
            .and(query_param("dl", "1"))
            .respond_with(ResponseTemplate::new(status).set_body_string(remote_path))
            .mount(server)
            .await;
    }

    fn client_for(server: &MockServer) -> ShareClient {
        let urls = ShareUrls::new(&server.uri(), "abc123").unwrap();
        let retry = RetryPolicy {
            tries: 1,
            delay: Duration::from_millis(1),
        };
        ShareClient::new(urls, retry, Duration::from_secs(5)).unwrap()
    }

    async fn crawl(server: &MockServer, out: &Path) -> Result<CrawlReport, CrawlError> {
        let client = client_for(server);
        let parser = SeafileListing::new();
        let crawler = Crawler::new(&client, &parser, DownloadOptions::default(), Duration::ZERO);
        crawler.run(DirectoryNode::new("/", out)).await
    }

    // Every request the server saw, as "list:<p>" or "file:<p>"
    async fn request_log(server: &MockServer) -> Vec<String> {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| {
                let p = request
                    .url
                    .query_pairs()
                    .find(|(k, _)| k == "p")
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_default();
                if request.url.path().ends_with("/files/") {
                    format!("file:{}", p)
                } else {
                    format!("list:{}", p)
                }
            })
            .collect()
    }

    // Root with folder "docs" (holding report.pdf) and file readme.txt
    async fn mount_docs_share(server: &MockServer) {
        mount_listing(
            server,
            "/",
            listing_html(&[Row::Dir("/docs"), Row::File("/readme.txt")]),
        )
        .await;
        mount_listing(server, "/docs", listing_html(&[Row::File("/docs/report.pdf")])).await;
        mount_file(server, "/docs/report.pdf", 200).await;
        mount_file(server, "/readme.txt", 200).await;
    }

    #[tokio::test]
    async fn test_mirrors_share_depth_first() {
        let server = MockServer::start().await;
        mount_docs_share(&server).await;
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");

        let report = crawl(&server, &out).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(std::fs::read_to_string(out.join("readme.txt")).unwrap(), "/readme.txt");
        assert_eq!(
            std::fs::read_to_string(out.join("docs").join("report.pdf")).unwrap(),
            "/docs/report.pdf"
        );
        assert_eq!(report.directories, vec![out.clone(), out.join("docs")]);
        assert_eq!(report.downloaded.len(), 2);
        assert_eq!(
            request_log(&server).await,
            vec!["list:/", "list:/docs", "file:/docs/report.pdf", "file:/readme.txt"]
        );
    }

    #[tokio::test]
    async fn test_second_run_downloads_nothing() {
        let server = MockServer::start().await;
        mount_docs_share(&server).await;
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");

        crawl(&server, &out).await.unwrap();
        server.reset().await;
        mount_docs_share(&server).await;

        let report = crawl(&server, &out).await.unwrap();

        assert!(report.downloaded.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert!(report
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::AlreadyExists));
        assert_eq!(request_log(&server).await, vec!["list:/", "list:/docs"]);
    }

    #[tokio::test]
    async fn test_one_failed_file_does_not_stop_the_crawl() {
        let server = MockServer::start().await;
        mount_listing(
            &server,
            "/",
            listing_html(&[
                Row::File("/1.bin"),
                Row::File("/2.bin"),
                Row::File("/3.bin"),
                Row::File("/4.bin"),
                Row::File("/5.bin"),
            ]),
        )
        .await;
        for p in ["/1.bin", "/2.bin", "/4.bin", "/5.bin"] {
            mount_file(&server, p, 200).await;
        }
        mount_file(&server, "/3.bin", 500).await;
        let dir = TempDir::new().unwrap();

        let report = crawl(&server, dir.path()).await.unwrap();

        assert_eq!(report.downloaded.len(), 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, FailureKind::Download);
        assert_eq!(report.failures[0].remote_path, "/3.bin");
        assert!(!dir.path().join("3.bin").exists());
        assert!(dir.path().join("5.bin").exists());
    }

    #[tokio::test]
    async fn test_cut_off_download_is_recorded_and_crawl_continues() {
        let server = MockServer::start().await;
        let broken = serve_cut_off_body(100, b"0123456789").await;
        mount_listing(
            &server,
            "/",
            listing_html(&[
                Row::Link {
                    name: "big.bin",
                    href: format!("http://{}/d/abc123/files/?p=/big.bin", broken),
                },
                Row::File("/after.txt"),
            ]),
        )
        .await;
        mount_file(&server, "/after.txt", 200).await;
        let dir = TempDir::new().unwrap();

        let report = crawl(&server, dir.path()).await.unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, FailureKind::Download);
        assert_eq!(report.failures[0].remote_path, "/big.bin");
        assert_eq!(report.downloaded.len(), 1);
        // Only the finished file is on disk: no partial body, no staging file
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["after.txt"]);
    }

    #[tokio::test]
    async fn test_staging_never_clobbers_a_listed_file() {
        let server = MockServer::start().await;
        mount_listing(
            &server,
            "/",
            listing_html(&[Row::File("/notes.part"), Row::File("/notes")]),
        )
        .await;
        mount_file(&server, "/notes.part", 200).await;
        mount_file(&server, "/notes", 200).await;
        let dir = TempDir::new().unwrap();

        let report = crawl(&server, dir.path()).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.downloaded.len(), 2);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("notes.part")).unwrap(),
            "/notes.part"
        );
        assert_eq!(std::fs::read_to_string(dir.path().join("notes")).unwrap(), "/notes");
    }

    #[tokio::test]
    async fn test_unusable_name_is_recorded_and_siblings_survive() {
        let server = MockServer::start().await;
        mount_listing(
            &server,
            "/",
            listing_html(&[Row::Dir("/.."), Row::File("/ok.txt")]),
        )
        .await;
        mount_file(&server, "/ok.txt", 200).await;
        let dir = TempDir::new().unwrap();

        let report = crawl(&server, dir.path()).await.unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, FailureKind::Rejected);
        assert_eq!(report.failures[0].remote_path, "/..");
        assert_eq!(report.downloaded.len(), 1);
        assert!(dir.path().join("ok.txt").exists());
        assert_eq!(request_log(&server).await, vec!["list:/", "file:/ok.txt"]);
    }

    #[tokio::test]
    async fn test_broken_listing_only_loses_its_subtree() {
        let server = MockServer::start().await;
        mount_listing(&server, "/", listing_html(&[Row::Dir("/a"), Row::Dir("/b")])).await;
        mount_listing(&server, "/a", "<h1>Something went wrong</h1>".to_string()).await;
        mount_listing(&server, "/b", listing_html(&[Row::File("/b/ok.txt")])).await;
        mount_file(&server, "/b/ok.txt", 200).await;
        let dir = TempDir::new().unwrap();

        let report = crawl(&server, dir.path()).await.unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, FailureKind::Listing);
        assert_eq!(report.failures[0].remote_path, "/a");
        // No local directory without a successful listing
        assert!(!dir.path().join("a").exists());
        assert!(dir.path().join("b").join("ok.txt").exists());
    }

    #[tokio::test]
    async fn test_local_tree_matches_remote_tree() {
        let server = MockServer::start().await;
        mount_listing(&server, "/", listing_html(&[Row::Dir("/x"), Row::Dir("/empty")])).await;
        mount_listing(&server, "/x", listing_html(&[Row::Dir("/x/y")])).await;
        mount_listing(&server, "/x/y", listing_html(&[Row::Dir("/x/y/z")])).await;
        mount_listing(&server, "/x/y/z", listing_html(&[])).await;
        mount_listing(&server, "/empty", listing_html(&[])).await;
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("mirror");

        let report = crawl(&server, &out).await.unwrap();

        assert_eq!(
            report.directories,
            vec![
                out.clone(),
                out.join("x"),
                out.join("x/y"),
                out.join("x/y/z"),
                out.join("empty"),
            ]
        );
        for d in &report.directories {
            assert!(d.is_dir(), "{} should exist", d.display());
        }
        assert!(report.downloaded.is_empty());
    }

    #[tokio::test]
    async fn test_directory_linking_to_itself_is_listed_once() {
        let server = MockServer::start().await;
        mount_listing(&server, "/", listing_html(&[Row::Dir("/loop")])).await;
        mount_listing(&server, "/loop", listing_html(&[Row::Dir("/loop")])).await;
        let dir = TempDir::new().unwrap();

        let report = crawl(&server, dir.path()).await.unwrap();

        assert_eq!(report.directories.len(), 2);
        assert_eq!(request_log(&server).await, vec!["list:/", "list:/loop"]);
    }

    #[tokio::test]
    async fn test_unreachable_root_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");

        let result = crawl(&server, &out).await;

        assert!(matches!(result, Err(CrawlError::RootListing { .. })));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_unwritable_output_stops_the_run() {
        let server = MockServer::start().await;
        mount_docs_share(&server).await;
        let dir = TempDir::new().unwrap();
        // A plain file where the output directory should go
        let out = dir.path().join("out");
        std::fs::write(&out, b"not a directory").unwrap();

        let result = crawl(&server, &out).await;

        assert!(matches!(result, Err(CrawlError::Filesystem(_))));
    }
}

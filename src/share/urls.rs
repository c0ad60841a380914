// src/share/urls.rs
// =============================================================================
// The URL scheme of a Seafile share link.
//
// A share is served under `<base>/d/<token>/`. Listing pages hang off it as
//   <base>/d/<token>/?p=<path>&mode=list
// File download links come from the listing itself (see listing/seafile.rs).
//
// `path` is always the remote path inside the share, starting with '/'.
// The `url` crate does the percent-encoding of the query for us.
// =============================================================================

use anyhow::{anyhow, Result};
use url::Url;

/// Builds listing URLs for one share token.
#[derive(Debug, Clone)]
pub struct ShareUrls {
    share_root: Url,
    token: String,
}

impl ShareUrls {
    /// Creates the URL builder from a server base and a share token
    ///
    /// The base may or may not end with '/', and may contain a sub-path
    /// (e.g. "https://example.com/seafile").
    pub fn new(base: &str, token: &str) -> Result<Self> {
        let token = token.trim().trim_matches('/');
        if token.is_empty() || token.contains('/') {
            return Err(anyhow!("Invalid share token: '{}'", token));
        }

        let mut base = Url::parse(base).map_err(|e| anyhow!("Invalid base URL '{}': {}", base, e))?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(anyhow!("Base URL must be http(s): {}", base));
        }

        // Url::join treats the last segment as a file unless it ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let share_root = base
            .join(&format!("d/{}/", token))
            .map_err(|e| anyhow!("Cannot build share URL for token '{}': {}", token, e))?;

        Ok(Self {
            share_root,
            token: token.to_string(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// URL of the listing page for a directory inside the share
    pub fn listing_url(&self, remote_path: &str) -> Url {
        let mut url = self.share_root.clone();
        url.query_pairs_mut()
            .append_pair("p", &normalize_remote_path(remote_path))
            .append_pair("mode", "list");
        url
    }
}

/// Makes sure a remote path starts with exactly one '/'
///
/// "" -> "/", "docs" -> "/docs", "//docs/" -> "/docs/"
pub fn normalize_remote_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

// src/listing/seafile.rs
// =============================================================================
// Parses the "list" view of a Seafile share directory.
//
// The page we expect looks like this (trimmed):
//
//   <table>
//     <tr><th>Name</th><th>Size</th>...</tr>
//     <tr>                  <td><a class="normal" href="?p=/docs&mode=list">docs</a></td></tr>
//     <tr class="file-item"><td><a class="normal" href="files/?p=/a.pdf">a.pdf</a></td></tr>
//   </table>
//
// - every row with an `a.normal` link is an entry
// - rows with class `file-item` are files, the others are directories
// - the remote path of an entry is the `p` query parameter of its link, and
//   its name is the last component of that path (the link text may be
//   shortened or padded by the template)
// - an empty directory may render `.empty-tips` instead of a table
//
// We use `scraper` (CSS selectors over an html5ever DOM) and `url` to resolve
// relative links against the page URL.
// =============================================================================

use super::{DirectoryEntry, Entry, FileEntry, ListingPage, ListingParser, RejectedEntry};
use crate::error::ParseError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

const FILE_ROW_CLASS: &str = "file-item";

/// Listing parser for Seafile's server-rendered share pages
#[derive(Debug, Clone)]
pub struct SeafileListing {
    table: Selector,
    row: Selector,
    link: Selector,
    empty_marker: Selector,
}

impl Default for SeafileListing {
    fn default() -> Self {
        Self::new()
    }
}

impl SeafileListing {
    pub fn new() -> Self {
        Self {
            table: selector("table"),
            row: selector("tr"),
            link: selector("a.normal"),
            empty_marker: selector(".empty-tips"),
        }
    }

    // Adds the row's entry to `page`. Rows without an entry link are
    // skipped; a link we cannot follow fails the whole page.
    fn parse_row(
        &self,
        row: ElementRef<'_>,
        page_url: &Url,
        page: &mut ListingPage,
    ) -> Result<(), ParseError> {
        // Header rows and decoration rows have no entry link
        let Some(link) = row.select(&self.link).next() else {
            return Ok(());
        };

        let text = link.text().collect::<String>();
        let href = link.value().attr("href").ok_or_else(|| ParseError::MissingHref {
            url: page_url.to_string(),
            name: text.trim().to_string(),
        })?;

        let target = page_url.join(href).map_err(|_| ParseError::InvalidLink {
            url: page_url.to_string(),
            name: text.trim().to_string(),
            href: href.to_string(),
        })?;

        let remote_path = target
            .query_pairs()
            .find(|(key, _)| key == "p")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| ParseError::MissingPath {
                url: page_url.to_string(),
                name: text.trim().to_string(),
                href: href.to_string(),
            })?;

        let name = entry_name(&remote_path, &text);
        if !is_safe_name(&name) {
            page.rejected.push(RejectedEntry {
                name,
                remote_path,
                reason: "name cannot be used as a local file name".to_string(),
            });
            return Ok(());
        }

        let is_file = row.value().classes().any(|class| class == FILE_ROW_CLASS);
        let entry = if is_file {
            Entry::File(FileEntry {
                name,
                remote_path,
                url: download_url(target),
            })
        } else {
            Entry::Directory(DirectoryEntry { name, remote_path })
        };

        page.entries.push(entry);
        Ok(())
    }
}

impl ListingParser for SeafileListing {
    fn parse(&self, html: &str, page_url: &Url) -> Result<ListingPage, ParseError> {
        let document = Html::parse_document(html);

        if document.select(&self.table).next().is_none() {
            if document.select(&self.empty_marker).next().is_some() {
                return Ok(ListingPage::default());
            }
            return Err(ParseError::MissingEntryTable {
                url: page_url.to_string(),
            });
        }

        let mut page = ListingPage::default();
        for row in document.select(&self.row) {
            self.parse_row(row, page_url, &mut page)?;
        }

        Ok(page)
    }
}

// Our selectors are constants, so a parse failure is a programmer error
fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("constant CSS selector must be valid")
}

// Turns a file's link into a direct download by forcing `dl=1`
fn download_url(mut url: Url) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "dl")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("dl", "1");
    url
}

// The last component of the remote path, exactly as the server names it.
// Only when the path has no component (the share root) is the link text used.
fn entry_name(remote_path: &str, link_text: &str) -> String {
    match remote_path.trim_end_matches('/').rsplit('/').next() {
        Some(last) if !last.is_empty() => last.to_string(),
        _ => link_text.trim().to_string(),
    }
}

// The name becomes one component of a local path, so it must not be able to
// climb out of the output directory. '\\' is an ordinary character except on
// Windows.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\0'])
        && !(cfg!(windows) && name.contains('\\'))
}

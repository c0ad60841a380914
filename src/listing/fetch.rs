// src/listing/fetch.rs
// =============================================================================
// Fetches one directory's listing page and parses it.
// =============================================================================

use super::{ListingPage, ListingParser};
use crate::error::ListingError;
use crate::share::ShareClient;
use tracing::debug;

/// Downloads and parses the listing page of `remote_path`
pub async fn fetch_listing(
    client: &ShareClient,
    parser: &dyn ListingParser,
    remote_path: &str,
) -> Result<ListingPage, ListingError> {
    let url = client.urls().listing_url(remote_path);
    let response = client.get(&url).await?;

    let html = response.text().await.map_err(|source| ListingError::Body {
        url: url.to_string(),
        source,
    })?;

    let page = parser.parse(&html, &url)?;
    debug!(
        path = remote_path,
        directories = page.directory_count(),
        files = page.file_count(),
        "parsed listing"
    );

    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ParseError, RequestError};
    use crate::listing::{Entry, SeafileListing};
    use crate::share::{RetryPolicy, ShareUrls};
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ShareClient {
        let urls = ShareUrls::new(&server.uri(), "abc123").unwrap();
        let retry = RetryPolicy {
            tries: 1,
            delay: Duration::from_millis(1),
        };
        ShareClient::new(urls, retry, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_listing_requests_list_mode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/d/abc123/"))
            .and(query_param("p", "/docs"))
            .and(query_param("mode", "list"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<table><tr class="file-item"><td>
                   <a class="normal" href="/d/abc123/files/?p=%2Fdocs%2Freport.pdf">report.pdf</a>
                   </td></tr></table>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let page = fetch_listing(&client_for(&server), &SeafileListing::new(), "/docs")
            .await
            .unwrap();

        match &page.entries[..] {
            [Entry::File(file)] => {
                assert_eq!(file.name, "report.pdf");
                assert_eq!(file.remote_path, "/docs/report.pdf");
                assert_eq!(
                    file.url.as_str(),
                    format!("{}/d/abc123/files/?p=%2Fdocs%2Freport.pdf&dl=1", server.uri())
                );
            }
            other => panic!("unexpected entries: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_listing_reports_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = fetch_listing(&client_for(&server), &SeafileListing::new(), "/").await;
        assert!(matches!(
            result,
            Err(ListingError::Request(RequestError::Status { status: 404, .. }))
        ));
    }

    #[tokio::test]
    async fn test_fetch_listing_reports_markup_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>login required</p>"))
            .mount(&server)
            .await;

        let result = fetch_listing(&client_for(&server), &SeafileListing::new(), "/").await;
        assert!(matches!(
            result,
            Err(ListingError::Parse(ParseError::MissingEntryTable { .. }))
        ));
    }
}

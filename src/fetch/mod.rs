//! Release retrieval from the GitHub releases API.

mod basic;
pub mod auth;

pub use basic::BasicClient;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Request, Response};
use tracing::{debug, info};

use crate::config::RepoSource;
use crate::error::{Error, Result};
use crate::release::RawRelease;

const GITHUB_JSON: &str = "application/vnd.github+json";

/// Executes a prepared request. Wrappers such as [`auth::ApiKey`] decorate
/// another client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// Fetches up to `max_pages` pages of releases for `source`.
///
/// Paging stops early once a page holds fewer than `per_page` records.
///
/// # Errors
///
/// Returns [`Error::Fetch`] on transport failure, a non-success status, or a
/// body that is not a JSON array of releases.
#[tracing::instrument(skip(client, source), fields(repository = %source.name))]
pub async fn fetch_releases<C: HttpClient>(
    client: &C,
    source: &RepoSource,
    per_page: u32,
    max_pages: u32,
) -> Result<Vec<RawRelease>> {
    let mut releases = Vec::new();

    for page in 1..=max_pages.max(1) {
        let batch = fetch_page(client, source, per_page, page).await?;
        let len = batch.len();
        debug!(page, len, "Release page received");
        releases.extend(batch);

        if len < per_page as usize {
            break;
        }
    }

    info!(count = releases.len(), "Releases fetched");
    Ok(releases)
}

async fn fetch_page<C: HttpClient>(
    client: &C,
    source: &RepoSource,
    per_page: u32,
    page: u32,
) -> Result<Vec<RawRelease>> {
    let mut url = reqwest::Url::parse(&source.url)
        .map_err(|e| Error::fetch(&source.name, format!("invalid url {}: {e}", source.url)))?;
    url.query_pairs_mut()
        .append_pair("per_page", &per_page.to_string())
        .append_pair("page", &page.to_string());

    let mut req = reqwest::Request::new(reqwest::Method::GET, url);
    req.headers_mut()
        .insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));

    let resp = client
        .execute(req)
        .await
        .map_err(|e| Error::fetch(&source.name, e))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::fetch(
            &source.name,
            format!("API returned status {status}: {body}"),
        ));
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| Error::fetch(&source.name, e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::fetch(&source.name, format!("failed to parse response: {e}")))
}


#[cfg(test)]
mod tests {
    use super::testing::FakeClient;
    use super::*;

    const URL: &str = "https://api.test/repos/acme/widgets/releases";

    fn source() -> RepoSource {
        RepoSource {
            name: "widgets".to_string(),
            url: URL.to_string(),
        }
    }

    fn page_url(per_page: u32, page: u32) -> String {
        format!("{URL}?per_page={per_page}&page={page}")
    }

    fn releases_json(n: usize) -> String {
        let items: Vec<String> = (0..n)
            .map(|i| format!(r#"{{"tag_name":"v{i}","published_at":"2024-03-04T10:00:00Z"}}"#))
            .collect();
        format!("[{}]", items.join(","))
    }

    #[tokio::test]
    async fn test_single_page_is_one_request() {
        let client = FakeClient::new().with_page(&page_url(100, 1), 200, &releases_json(2));

        let releases = fetch_releases(&client, &source(), 100, 1).await.unwrap();

        assert_eq!(releases.len(), 2);
        assert_eq!(releases[1].tag_name.as_deref(), Some("v1"));
        let seen = client.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].accept.as_deref(), Some(GITHUB_JSON));
    }

    #[tokio::test]
    async fn test_paging_stops_on_short_page() {
        let client = FakeClient::new()
            .with_page(&page_url(2, 1), 200, &releases_json(2))
            .with_page(&page_url(2, 2), 200, &releases_json(1));

        let releases = fetch_releases(&client, &source(), 2, 5).await.unwrap();

        assert_eq!(releases.len(), 3);
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_error_status_is_fetch_error() {
        let client = FakeClient::new().with_page(&page_url(100, 1), 403, "rate limited");

        let err = fetch_releases(&client, &source(), 100, 1).await.unwrap_err();

        match err {
            Error::Fetch {
                repository,
                message,
            } => {
                assert_eq!(repository, "widgets");
                assert!(message.contains("403"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_array_body_is_fetch_error() {
        let client = FakeClient::new().with_page(&page_url(100, 1), 200, r#"{"message":"hi"}"#);

        let err = fetch_releases(&client, &source(), 100, 1).await.unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_invalid_url_is_fetch_error() {
        let client = FakeClient::new();
        let bad = RepoSource {
            name: "bad".to_string(),
            url: "not a url".to_string(),
        };

        let err = fetch_releases(&client, &bad, 100, 1).await.unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
        assert!(client.requests().is_empty());
    }
}

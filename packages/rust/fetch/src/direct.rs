//! Unauthenticated fetcher.

use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use substack2md_shared::Result;

use crate::{FetchOutcome, PageFetcher, build_client, fetch_page_text};

/// Marker element rendered on gated posts.
static PAYWALL_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2.paywall-title").expect("paywall selector"));

/// Fetches posts without a session. Gated posts come back as
/// [`FetchOutcome::Paywalled`].
pub struct DirectFetcher {
    client: reqwest::Client,
}

impl DirectFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs, false)?,
        })
    }
}

#[async_trait]
impl PageFetcher for DirectFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchOutcome> {
        let body = fetch_page_text(&self.client, url).await?;
        let document = Html::parse_document(&body);
        if document.select(&PAYWALL_TITLE).next().is_some() {
            debug!(%url, "post is gated, skipping");
            return Ok(FetchOutcome::Paywalled);
        }
        Ok(FetchOutcome::Page(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn open_post_is_returned_as_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/p/open"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><h1 class=\"post-title\">Open</h1></body></html>",
            ))
            .mount(&server)
            .await;

        let fetcher = DirectFetcher::new(5).unwrap();
        let url = Url::parse(&format!("{}/p/open", server.uri())).unwrap();
        match fetcher.fetch(&url).await.unwrap() {
            FetchOutcome::Page(_) => {}
            FetchOutcome::Paywalled => panic!("open post flagged as gated"),
        }
    }

    #[tokio::test]
    async fn gated_post_is_flagged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/p/gated"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><h2 class=\"paywall-title\">This post is for paid subscribers</h2></body></html>",
            ))
            .mount(&server)
            .await;

        let fetcher = DirectFetcher::new(5).unwrap();
        let url = Url::parse(&format!("{}/p/gated", server.uri())).unwrap();
        match fetcher.fetch(&url).await.unwrap() {
            FetchOutcome::Paywalled => {}
            FetchOutcome::Page(_) => panic!("gated post not flagged"),
        }
    }

    #[tokio::test]
    async fn http_error_is_a_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/p/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = DirectFetcher::new(5).unwrap();
        let url = Url::parse(&format!("{}/p/missing", server.uri())).unwrap();
        assert!(fetcher.fetch(&url).await.is_err());
    }
}

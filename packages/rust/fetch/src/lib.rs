//! Page fetching capability.
//!
//! The orchestrator talks to a [`PageFetcher`], never to a concrete variant:
//! - [`DirectFetcher`]: stateless request per URL, detects gated posts and
//!   signals them with [`FetchOutcome::Paywalled`] instead of an error.
//! - [`AuthenticatedFetcher`]: persistent cookie session established by a
//!   login sequence at construction; assumed to bypass paywalls.
//!
//! Both variants hand the extractor a parsed document, not raw bytes.

mod direct;
mod session;

use async_trait::async_trait;
use scraper::Html;
use url::Url;

use substack2md_shared::{ArchiveError, Result};

pub use direct::DirectFetcher;
pub use session::{AuthenticatedFetcher, Credentials, LoginOptions};

/// User-Agent string for post fetches.
const USER_AGENT: &str = concat!("substack2md/", env!("CARGO_PKG_VERSION"));

/// Result of fetching one post URL.
pub enum FetchOutcome {
    /// The parsed post page.
    Page(Html),
    /// The post is gated; counted as processed-and-skipped, not a failure.
    Paywalled,
}

/// Capability to turn a post URL into a parsed document.
#[async_trait]
pub trait PageFetcher {
    /// Fetch and parse one post page, or signal a paywall skip.
    ///
    /// Unrecoverable network failures are errors; the orchestrator isolates
    /// them to the single post.
    async fn fetch(&self, url: &Url) -> Result<FetchOutcome>;
}

/// Build the HTTP client shared by the fetcher variants.
pub(crate) fn build_client(timeout_secs: u64, cookie_store: bool) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .cookie_store(cookie_store)
        .build()
        .map_err(|e| ArchiveError::Network(format!("failed to build HTTP client: {e}")))
}

pub(crate) async fn fetch_page_text(client: &reqwest::Client, url: &Url) -> Result<String> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| ArchiveError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ArchiveError::Network(format!("{url}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| ArchiveError::Network(format!("{url}: failed to read body: {e}")))
}

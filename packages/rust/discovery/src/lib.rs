//! Post URL discovery for a publication.
//!
//! The full post archive is published at `<root>/sitemap.xml`; when that is
//! unavailable or empty we fall back to `<root>/feed.xml`, which only exposes
//! the most recent posts (a known cap, reported as a notice rather than an
//! error). Non-post sections are removed with a keyword exclusion filter.

mod parser;

use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

use substack2md_shared::{ArchiveError, Result};

/// Maximum number of redirects to follow during discovery.
const MAX_REDIRECTS: usize = 3;

/// User-Agent string for discovery requests.
const USER_AGENT: &str = concat!("substack2md/", env!("CARGO_PKG_VERSION"));

/// Resolve the ordered list of post URLs for a publication.
///
/// A failed sitemap fetch degrades to the feed; a failed feed fetch after
/// that yields an empty list. Discovery never fails the run.
#[instrument(skip_all, fields(base = %base_url))]
pub async fn resolve_post_urls(
    base_url: &Url,
    exclude_keywords: &[String],
    timeout_secs: u64,
) -> Vec<String> {
    let client = match build_client(timeout_secs) {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "could not build discovery HTTP client");
            return Vec::new();
        }
    };

    let mut urls = match fetch_sitemap(&client, base_url).await {
        Ok(urls) if !urls.is_empty() => urls,
        Ok(_) => {
            info!("sitemap contained no entries, falling back to feed");
            fetch_feed_or_empty(&client, base_url).await
        }
        Err(e) => {
            warn!(error = %e, "sitemap fetch failed, falling back to feed");
            fetch_feed_or_empty(&client, base_url).await
        }
    };

    let before = urls.len();
    urls.retain(|url| !exclude_keywords.iter().any(|kw| url.contains(kw.as_str())));
    debug!(
        resolved = urls.len(),
        excluded = before - urls.len(),
        "post URL resolution complete"
    );

    urls
}

/// Build a reqwest client with appropriate settings.
fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ArchiveError::Network(format!("failed to build HTTP client: {e}")))
}

/// Fetch and parse `<root>/sitemap.xml`.
async fn fetch_sitemap(client: &Client, base_url: &Url) -> Result<Vec<String>> {
    let body = fetch_text(client, &format!("{base_url}sitemap.xml")).await?;
    Ok(parser::sitemap_locations(&body))
}

/// Fetch `<root>/feed.xml`, degrading to an empty list on failure.
async fn fetch_feed_or_empty(client: &Client, base_url: &Url) -> Vec<String> {
    info!("feed.xml only exposes the most recent posts; older posts will be missed");
    match fetch_text(client, &format!("{base_url}feed.xml")).await {
        Ok(body) => parser::feed_links(&body),
        Err(e) => {
            warn!(error = %e, "feed fetch failed, no post URLs resolved");
            Vec::new()
        }
    }
}

async fn fetch_text(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
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

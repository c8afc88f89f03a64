//! Sitemap and syndication feed parsing.
//!
//! Substack serves both documents with a stable, flat structure, so the
//! entries are pulled out with anchored patterns rather than a full XML
//! parser: `<loc>` elements for the sitemap, `<item>`-scoped `<link>`
//! elements for the feed.

use std::sync::LazyLock;

use regex::Regex;

/// Matches a sitemap `<loc>` element, namespace-agnostic.
static LOC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<loc>\s*([^<]+?)\s*</loc>").expect("loc regex"));

/// Matches one `<item>` block in an RSS feed.
static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<item>(.*?)</item>").expect("item regex"));

/// Matches a `<link>` element inside an item block.
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<link>\s*([^<]+?)\s*</link>").expect("link regex"));

/// Extract every location entry from a sitemap document, in document order.
pub(crate) fn sitemap_locations(xml: &str) -> Vec<String> {
    LOC_RE
        .captures_iter(xml)
        .map(|c| c[1].to_string())
        .collect()
}

/// Extract each item's link from a syndication feed document.
///
/// Only `<link>` elements inside `<item>` blocks count; the channel-level
/// link is not a post.
pub(crate) fn feed_links(xml: &str) -> Vec<String> {
    ITEM_RE
        .captures_iter(xml)
        .filter_map(|item| LINK_RE.captures(&item[1]).map(|c| c[1].to_string()))
        .collect()
}

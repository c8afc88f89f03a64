//! Post metadata and body extraction.
//!
//! Pulls the five fields of a post out of its parsed page. Only the title is
//! load-bearing: a page without one is not a post and extraction fails.
//! Every other field degrades to a placeholder so one redesigned page
//! element never sinks an archive run.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use substack2md_shared::{ArchiveError, PostData, Result};

/// Stand-in when the publication date cannot be located.
pub const DATE_PLACEHOLDER: &str = "Date not found";

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1.post-title").expect("title selector"));
static TITLE_FALLBACK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2").expect("title fallback selector"));
static SUBTITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3.subtitle").expect("subtitle selector"));
static DATE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[class*="pencraft"][class*="_meta_"]"#).expect("date selector")
});
static LIKES: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.post-ufi-button .label").expect("likes selector"));
static CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.available-content").expect("content selector"));

/// Extract the post fields from a parsed page.
///
/// `url` is carried through untouched for the ledger.
pub fn extract_post(document: &Html, url: &Url) -> Result<PostData> {
    let title = document
        .select(&TITLE)
        .next()
        .or_else(|| document.select(&TITLE_FALLBACK).next())
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ArchiveError::extraction(format!("{url}: no post title found")))?;

    let subtitle = document
        .select(&SUBTITLE)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty());

    let date = document
        .select(&DATE)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| {
            warn!(%url, "publication date not found, using placeholder");
            DATE_PLACEHOLDER.to_string()
        });

    let like_count = document
        .select(&LIKES)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or_else(|| "0".to_string());

    let body_html = document
        .select(&CONTENT)
        .next()
        .map(|el| el.html())
        .unwrap_or_default();

    debug!(%url, %title, "post extracted");

    Ok(PostData {
        url: url.clone(),
        title,
        subtitle,
        date,
        like_count,
        body_html,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(inner: &str) -> Html {
        Html::parse_document(&format!("<html><body>{inner}</body></html>"))
    }

    fn url() -> Url {
        Url::parse("https://example.substack.com/p/first").unwrap()
    }

    #[test]
    fn full_post_extracts_every_field() {
        let doc = page(concat!(
            "<h1 class=\"post-title\">The Title</h1>",
            "<h3 class=\"subtitle\">A subtitle</h3>",
            "<div class=\"pencraft pc-reset _meta_abc123\">Jan 05, 2024</div>",
            "<a class=\"post-ufi-button\"><div class=\"label\">42</div></a>",
            "<div class=\"available-content\"><p>Body text.</p></div>",
        ));

        let post = extract_post(&doc, &url()).unwrap();
        assert_eq!(post.title, "The Title");
        assert_eq!(post.subtitle.as_deref(), Some("A subtitle"));
        assert_eq!(post.date, "Jan 05, 2024");
        assert_eq!(post.like_count, "42");
        assert!(post.body_html.contains("<p>Body text.</p>"));
        assert_eq!(post.url, url());
    }

    #[test]
    fn title_falls_back_to_h2() {
        let doc = page("<h2>Fallback Title</h2><div class=\"available-content\"></div>");
        let post = extract_post(&doc, &url()).unwrap();
        assert_eq!(post.title, "Fallback Title");
    }

    #[test]
    fn missing_title_is_an_extraction_error() {
        let doc = page("<div class=\"available-content\"><p>orphan body</p></div>");
        let err = extract_post(&doc, &url()).unwrap_err();
        assert!(matches!(err, ArchiveError::Extraction { .. }));
    }

    #[test]
    fn missing_date_uses_placeholder() {
        let doc = page("<h1 class=\"post-title\">T</h1>");
        let post = extract_post(&doc, &url()).unwrap();
        assert_eq!(post.date, DATE_PLACEHOLDER);
    }

    #[test]
    fn non_numeric_like_label_defaults_to_zero() {
        let doc = page(concat!(
            "<h1 class=\"post-title\">T</h1>",
            "<a class=\"post-ufi-button\"><div class=\"label\">Like</div></a>",
        ));
        let post = extract_post(&doc, &url()).unwrap();
        assert_eq!(post.like_count, "0");
    }

    #[test]
    fn missing_likes_default_to_zero() {
        let doc = page("<h1 class=\"post-title\">T</h1>");
        let post = extract_post(&doc, &url()).unwrap();
        assert_eq!(post.like_count, "0");
    }

    #[test]
    fn missing_body_is_empty_not_an_error() {
        let doc = page("<h1 class=\"post-title\">T</h1>");
        let post = extract_post(&doc, &url()).unwrap();
        assert!(post.body_html.is_empty());
    }
}

//! Markdown conversion and document composition.
//!
//! A post travels through here twice: the extracted body HTML becomes
//! markdown, and the finished markdown document is rendered back to HTML
//! for the browsable copy of the archive.

use pulldown_cmark::{Options, Parser, html};
use tracing::debug;

use substack2md_shared::{ArchiveError, PostData, Result};

/// Convert extracted body HTML to markdown.
///
/// Script and style elements are embedded player scaffolding, not content.
pub fn body_to_markdown(body_html: &str) -> Result<String> {
    htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style"])
        .build()
        .convert(body_html)
        .map_err(|e| ArchiveError::Conversion(format!("html to markdown: {e}")))
}

/// Compose the final markdown document from a post's fields and body.
///
/// Header layout: title, optional subtitle, bolded date, bolded like count,
/// then the body, each separated by a blank line.
pub fn compose_document(post: &PostData, body_markdown: &str) -> String {
    let mut doc = String::new();
    doc.push_str(&format!("# {}\n\n", post.title));
    if let Some(subtitle) = &post.subtitle {
        doc.push_str(&format!("## {subtitle}\n\n"));
    }
    doc.push_str(&format!("**{}**\n\n", post.date));
    doc.push_str(&format!("**Likes:** {}\n\n", post.like_count));
    doc.push_str(body_markdown);
    debug!(title = %post.title, bytes = doc.len(), "document composed");
    doc
}

/// Render a markdown document to an HTML fragment.
pub fn render_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

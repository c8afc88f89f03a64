//! Core domain types for substack2md archives.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::DefaultsConfig;
use crate::error::{ArchiveError, Result};

/// Matches the post slug in a `/p/<slug>` URL path.
static POST_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/p/([^/]+)").expect("post slug regex"));

// ---------------------------------------------------------------------------
// URL helpers
// ---------------------------------------------------------------------------

/// A URL points at an individual post when its path contains `/p/`.
pub fn is_post_url(url: &Url) -> bool {
    url.path().contains("/p/")
}

/// Reduce any publication URL to its root (`scheme://host/`).
pub fn publication_root(url: &Url) -> Result<Url> {
    url.host_str()
        .ok_or_else(|| ArchiveError::config(format!("URL has no host: {url}")))?;
    let mut root = url.clone();
    root.set_path("/");
    root.set_query(None);
    root.set_fragment(None);
    Ok(root)
}

/// Derive the writer identifier from the publication host.
///
/// `thefitzwilliam.substack.com` and `www.thefitzwilliam.com` both yield
/// `thefitzwilliam`.
pub fn writer_from_url(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| ArchiveError::config(format!("URL has no host: {url}")))?;
    let mut parts = host.split('.');
    let first = parts.next().unwrap_or_default();
    let name = if first == "www" {
        parts.next().unwrap_or_default()
    } else {
        first
    };
    if name.is_empty() {
        return Err(ArchiveError::config(format!(
            "cannot derive writer name from host '{host}'"
        )));
    }
    Ok(name.to_string())
}

/// The slug identifying a post within its publication (`/p/<slug>`).
pub fn post_slug(url: &str) -> String {
    POST_SLUG_RE
        .captures(url)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| "unknown_post".to_string())
}

/// The final path segment of a URL, used as the artifact file stem.
pub fn url_tail(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

// ---------------------------------------------------------------------------
// PublicationSession
// ---------------------------------------------------------------------------

/// Identifies the target of one archiving run.
///
/// Created once per invocation and immutable for the run's lifetime. Save
/// directories are resolved up front; per-writer subdirectories are derived
/// through the accessor methods.
#[derive(Debug, Clone)]
pub struct PublicationSession {
    /// Publication root (`scheme://host/`).
    pub base_url: Url,
    /// Writer identifier derived from the host.
    pub writer: String,
    /// Set when the run targets a single post instead of the full archive.
    pub single_post: Option<Url>,
    /// Root directory for markdown output.
    pub md_root: PathBuf,
    /// Root directory for HTML output.
    pub html_root: PathBuf,
    /// Root directory for localized images.
    pub image_root: PathBuf,
    /// Directory holding the per-writer JSON ledgers.
    pub data_dir: PathBuf,
    /// Whether remote images should be localized.
    pub download_images: bool,
    /// Maximum number of posts to process; 0 means unlimited.
    pub limit: usize,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl PublicationSession {
    /// Build a session for the given publication or post URL.
    pub fn new(
        url: &Url,
        dirs: &DefaultsConfig,
        download_images: bool,
        limit: usize,
    ) -> Result<Self> {
        let base_url = publication_root(url)?;
        let writer = writer_from_url(&base_url)?;
        let single_post = is_post_url(url).then(|| url.clone());

        Ok(Self {
            base_url,
            writer,
            single_post,
            md_root: PathBuf::from(&dirs.md_dir),
            html_root: PathBuf::from(&dirs.html_dir),
            image_root: PathBuf::from(&dirs.image_dir),
            data_dir: PathBuf::from(&dirs.data_dir),
            download_images,
            limit,
            timeout_secs: dirs.timeout_secs,
        })
    }

    /// Markdown save directory for this writer.
    pub fn md_dir(&self) -> PathBuf {
        self.md_root.join(&self.writer)
    }

    /// HTML save directory for this writer.
    pub fn html_dir(&self) -> PathBuf {
        self.html_root.join(&self.writer)
    }

    /// Image save directory for this writer (per-post subdirectories below).
    pub fn image_dir(&self) -> PathBuf {
        self.image_root.join(&self.writer)
    }

    /// Path of the per-writer ledger file.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.writer))
    }
}

// ---------------------------------------------------------------------------
// PostData
// ---------------------------------------------------------------------------

/// Structured data extracted from one post page.
///
/// Identity is the originating URL. Only the title is a hard requirement;
/// every other field degrades to a documented placeholder.
#[derive(Debug, Clone)]
pub struct PostData {
    /// Originating post URL.
    pub url: Url,
    /// Post title.
    pub title: String,
    /// Optional subtitle.
    pub subtitle: Option<String>,
    /// Publication date as displayed, or the extraction placeholder.
    pub date: String,
    /// Like count as displayed; `"0"` when absent or non-numeric.
    pub like_count: String,
    /// Raw markup of the post's content container, passed through unmodified.
    pub body_html: String,
}

// ---------------------------------------------------------------------------
// PostSummary (ledger entry)
// ---------------------------------------------------------------------------

/// One ledger entry. Field names match the historical on-disk JSON.
///
/// Entries are compared by full-record equality when merging, so two
/// scrapes of an unchanged post collapse into one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub title: String,
    pub subtitle: String,
    pub like_count: String,
    pub date: String,
    pub file_link: String,
    pub html_link: String,
}

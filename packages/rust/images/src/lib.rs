//! CDN image localization.
//!
//! Rewrites every CDN image reference in a markdown document to a relative
//! path under the image directory, downloading each image at most once.
//! A failed download is logged and the rewrite happens anyway; the document
//! keeps a dangling local reference instead of a remote one, and a rerun
//! repairs it because the file does not exist.

use std::collections::HashMap;
use std::path::Path;

use futures_util::StreamExt;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use substack2md_shared::{ArchiveError, PublicationSession, Result, relative_path};

/// Matches a markdown link target pointing at the image CDN.
static CDN_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((https://substackcdn\.com/image/fetch/[^\s)]+)\)").expect("cdn image regex")
});

/// Characters never allowed in an image filename.
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Longest filename kept before falling back to a content hash.
const MAX_FILENAME_LEN: usize = 100;

/// Count the CDN image references in a document.
pub fn count_cdn_images(markdown: &str) -> usize {
    CDN_IMAGE_RE.find_iter(markdown).count()
}

/// Download every CDN image referenced by `markdown` into the per-post image
/// directory and rewrite the references to relative local paths.
///
/// `on_image` runs once per reference, downloaded or not, so a bar sized by
/// [`count_cdn_images`] always completes.
pub async fn localize_images(
    client: &reqwest::Client,
    markdown: &str,
    session: &PublicationSession,
    post_slug: &str,
    mut on_image: impl FnMut(),
) -> Result<String> {
    let mut remote_urls: Vec<(String, usize)> = Vec::new();
    for caps in CDN_IMAGE_RE.captures_iter(markdown) {
        let url = &caps[1];
        match remote_urls.iter_mut().find(|(seen, _)| seen == url) {
            Some((_, occurrences)) => *occurrences += 1,
            None => remote_urls.push((url.to_string(), 1)),
        }
    }
    if remote_urls.is_empty() {
        return Ok(markdown.to_string());
    }

    let image_dir = session.image_dir().join(post_slug);
    tokio::fs::create_dir_all(&image_dir)
        .await
        .map_err(|e| ArchiveError::io(&image_dir, e))?;

    let md_dir = session.md_dir();
    let mut local: HashMap<String, String> = HashMap::new();
    for (url, occurrences) in &remote_urls {
        let filename = filename_for(client, url).await;
        let target = image_dir.join(&filename);

        if target.exists() {
            debug!(%url, path = %target.display(), "image already on disk");
        } else if let Err(e) = download_image(client, url, &target).await {
            warn!(%url, error = %e, "image download failed, reference left dangling");
        }

        local.insert(url.clone(), relative_path(&md_dir, &target));
        for _ in 0..*occurrences {
            on_image();
        }
    }

    let rewritten = CDN_IMAGE_RE.replace_all(markdown, |caps: &regex::Captures<'_>| {
        format!("({})", local[&caps[1]])
    });
    Ok(rewritten.into_owned())
}

/// Derive the local filename for a CDN image URL.
///
/// The CDN encodes the origin URL as the final path segment, so the tail is
/// percent-decoded before taking its basename. When the basename is empty
/// or unreasonably long the name degrades to a digest of the URL plus an
/// extension probed from the CDN.
async fn filename_for(client: &reqwest::Client, url: &str) -> String {
    let tail = url.rsplit('/').next().unwrap_or_default();
    let decoded = urlencoding::decode(tail)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| tail.to_string());
    let base = decoded.rsplit('/').next().unwrap_or_default();
    let cleaned: String = base.chars().filter(|c| !ILLEGAL_CHARS.contains(c)).collect();

    if !cleaned.is_empty() && cleaned.len() <= MAX_FILENAME_LEN {
        return cleaned;
    }

    let digest = Sha256::digest(url.as_bytes());
    format!("{:x}{}", digest, probe_extension(client, url).await)
}

/// Ask the CDN for the image's content type to pick an extension.
async fn probe_extension(client: &reqwest::Client, url: &str) -> &'static str {
    let content_type = match client.head(url).send().await {
        Ok(response) => response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        Err(_) => String::new(),
    };

    match content_type.as_str() {
        t if t.contains("png") => ".png",
        t if t.contains("gif") => ".gif",
        t if t.contains("webp") => ".webp",
        t if t.contains("svg") => ".svg",
        t if t.contains("avif") => ".avif",
        _ => ".jpg",
    }
}

/// Stream one image to disk.
async fn download_image(client: &reqwest::Client, url: &str, target: &Path) -> Result<()> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ArchiveError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ArchiveError::Network(format!("{url}: HTTP {status}")));
    }

    let mut file = tokio::fs::File::create(target)
        .await
        .map_err(|e| ArchiveError::io(target, e))?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ArchiveError::Network(format!("{url}: {e}")))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| ArchiveError::io(target, e))?;
    }
    file.flush().await.map_err(|e| ArchiveError::io(target, e))?;

    debug!(%url, path = %target.display(), "image downloaded");
    Ok(())
}

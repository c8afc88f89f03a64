//! The archive pipeline.
//!
//! One run: resolve post URLs, then for each post fetch, extract, convert,
//! localize images, and persist, finishing with the ledger merge and the
//! index page. Posts are processed sequentially; per-post failures are
//! isolated so one broken page never ends the run.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use url::Url;

use substack2md_archive::{
    generate_index_html, persist_ledger, wrap_html_page, write_if_absent,
};
use substack2md_extract::extract_post;
use substack2md_fetch::{FetchOutcome, PageFetcher};
use substack2md_images::{count_cdn_images, localize_images};
use substack2md_markdown::{body_to_markdown, compose_document, render_html};
use substack2md_shared::{
    ArchiveError, PostSummary, PublicationSession, Result, post_slug, relative_path, url_tail,
};

/// Receives pipeline progress events. The CLI drives progress bars from
/// this; library callers use [`SilentProgress`].
pub trait ProgressReporter {
    /// A new phase of the run began.
    fn phase(&self, message: &str) {
        let _ = message;
    }
    /// One post URL was handled, successfully or not.
    fn post_processed(&self, url: &str) {
        let _ = url;
    }
    /// Image localization started for one post.
    fn images_started(&self, total: usize) {
        let _ = total;
    }
    /// One image reference was handled.
    fn image_fetched(&self) {}
    /// Image localization for the post finished.
    fn images_finished(&self) {}
}

/// No-op reporter.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {}

/// Tallies for one archive run.
#[derive(Debug)]
pub struct ArchiveOutcome {
    /// Post URLs handled, including skips and failures.
    pub processed: usize,
    /// Posts newly written to disk.
    pub archived: usize,
    /// Posts skipped because their markdown file already existed.
    pub skipped_existing: usize,
    /// Posts skipped because they are gated.
    pub skipped_paywalled: usize,
    /// Posts that errored; details are in the log.
    pub failed: usize,
    /// Where the merged ledger was written.
    pub ledger_path: PathBuf,
    /// Where the browsable index page was written.
    pub index_path: PathBuf,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// What happened to a single post.
enum PostOutcome {
    Archived(PostSummary),
    SkippedExisting,
    Paywalled,
}

/// Run one full archive pass for the session's publication.
#[instrument(skip_all, fields(writer = %session.writer))]
pub async fn run_archive(
    session: &PublicationSession,
    exclude_keywords: &[String],
    fetcher: &dyn PageFetcher,
    progress: &dyn ProgressReporter,
) -> Result<ArchiveOutcome> {
    let started = Instant::now();
    ensure_dirs(session)?;

    progress.phase("resolving post URLs");
    let urls = match &session.single_post {
        Some(url) => vec![url.to_string()],
        None => {
            substack2md_discovery::resolve_post_urls(
                &session.base_url,
                exclude_keywords,
                session.timeout_secs,
            )
            .await
        }
    };
    info!(posts = urls.len(), "post URLs resolved");

    let image_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(session.timeout_secs))
        .build()
        .map_err(|e| ArchiveError::Network(format!("failed to build HTTP client: {e}")))?;

    progress.phase("archiving posts");
    let mut processed = 0;
    let mut archived = 0;
    let mut skipped_existing = 0;
    let mut skipped_paywalled = 0;
    let mut failed = 0;
    let mut summaries = Vec::new();

    for url in &urls {
        if session.limit > 0 && processed >= session.limit {
            info!(limit = session.limit, "post limit reached");
            break;
        }
        processed += 1;

        match archive_post(session, fetcher, &image_client, url, progress).await {
            Ok(PostOutcome::Archived(summary)) => {
                archived += 1;
                summaries.push(summary);
            }
            Ok(PostOutcome::SkippedExisting) => skipped_existing += 1,
            Ok(PostOutcome::Paywalled) => skipped_paywalled += 1,
            Err(e) => {
                warn!(%url, error = %e, "post failed");
                failed += 1;
            }
        }
        progress.post_processed(url);
    }

    progress.phase("persisting ledger");
    let (merged, ledger_path) = persist_ledger(session, summaries)?;
    let index_path = generate_index_html(session, &merged)?;

    Ok(ArchiveOutcome {
        processed,
        archived,
        skipped_existing,
        skipped_paywalled,
        failed,
        ledger_path,
        index_path,
        elapsed: started.elapsed(),
    })
}

fn ensure_dirs(session: &PublicationSession) -> Result<()> {
    for dir in [session.md_dir(), session.html_dir()] {
        std::fs::create_dir_all(&dir).map_err(|e| ArchiveError::io(&dir, e))?;
    }
    if session.download_images {
        let dir = session.image_dir();
        std::fs::create_dir_all(&dir).map_err(|e| ArchiveError::io(&dir, e))?;
    }
    Ok(())
}

/// Archive one post end to end.
///
/// The existence check on the markdown file runs before any network call,
/// so a rerun over an archived publication costs one discovery fetch and
/// nothing else.
async fn archive_post(
    session: &PublicationSession,
    fetcher: &dyn PageFetcher,
    image_client: &reqwest::Client,
    url: &str,
    progress: &dyn ProgressReporter,
) -> Result<PostOutcome> {
    let stem = url_tail(url);
    let md_path = session.md_dir().join(format!("{stem}.md"));
    if md_path.exists() {
        info!(%url, "already archived, skipping");
        return Ok(PostOutcome::SkippedExisting);
    }

    let parsed = Url::parse(url).map_err(|e| ArchiveError::parse(format!("{url}: {e}")))?;
    let document = match fetcher.fetch(&parsed).await? {
        FetchOutcome::Page(document) => document,
        FetchOutcome::Paywalled => return Ok(PostOutcome::Paywalled),
    };

    let post = extract_post(&document, &parsed)?;
    drop(document);

    let body = body_to_markdown(&post.body_html)?;
    let mut markdown = compose_document(&post, &body);

    if session.download_images {
        let total = count_cdn_images(&markdown);
        if total > 0 {
            progress.images_started(total);
            markdown = localize_images(image_client, &markdown, session, &post_slug(url), || {
                progress.image_fetched()
            })
            .await?;
            progress.images_finished();
        }
    }

    write_if_absent(&md_path, &markdown)?;

    let html_path = session.html_dir().join(format!("{stem}.html"));
    let fragment = render_html(&markdown);
    let page = wrap_html_page(&post.title, &fragment, &session.html_dir());
    write_if_absent(&html_path, &page)?;

    info!(%url, title = %post.title, "post archived");

    Ok(PostOutcome::Archived(PostSummary {
        title: post.title,
        subtitle: post.subtitle.unwrap_or_default(),
        like_count: post.like_count,
        date: post.date,
        file_link: md_path.to_string_lossy().into_owned(),
        html_link: relative_path(&session.html_root, &html_path),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use substack2md_fetch::DirectFetcher;
    use substack2md_shared::DefaultsConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn post_page(title: &str, likes: &str) -> String {
        format!(
            "<html><body>\
             <h1 class=\"post-title\">{title}</h1>\
             <h3 class=\"subtitle\">sub</h3>\
             <div class=\"pencraft _meta_x\">Jan 05, 2024</div>\
             <a class=\"post-ufi-button\"><div class=\"label\">{likes}</div></a>\
             <div class=\"available-content\"><p>Body of {title}.</p></div>\
             </body></html>"
        )
    }

    fn gated_page() -> String {
        "<html><body><h2 class=\"paywall-title\">Paid subscribers only</h2></body></html>"
            .to_string()
    }

    fn sitemap(base: &str, slugs: &[&str]) -> String {
        let entries: String = slugs
            .iter()
            .map(|s| format!("<url><loc>{base}p/{s}</loc></url>"))
            .collect();
        format!("<urlset>{entries}</urlset>")
    }

    fn session_for(server: &MockServer, root: &Path, limit: usize) -> PublicationSession {
        let dirs = DefaultsConfig {
            md_dir: root.join("md").to_string_lossy().into_owned(),
            html_dir: root.join("html").to_string_lossy().into_owned(),
            image_dir: root.join("img").to_string_lossy().into_owned(),
            data_dir: root.join("data").to_string_lossy().into_owned(),
            timeout_secs: 5,
        };
        let url = Url::parse(&format!("{}/", server.uri())).unwrap();
        PublicationSession::new(&url, &dirs, false, limit).unwrap()
    }

    async fn run(session: &PublicationSession) -> ArchiveOutcome {
        let fetcher = DirectFetcher::new(5).unwrap();
        run_archive(session, &[], &fetcher, &SilentProgress)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn full_run_archives_every_post() {
        let server = MockServer::start().await;
        let base = format!("{}/", server.uri());

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(sitemap(&base, &["one", "two"])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/p/one"))
            .respond_with(ResponseTemplate::new(200).set_body_string(post_page("One", "3")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/p/two"))
            .respond_with(ResponseTemplate::new(200).set_body_string(post_page("Two", "7")))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let session = session_for(&server, tmp.path(), 0);
        let outcome = run(&session).await;

        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.archived, 2);
        assert_eq!(outcome.failed, 0);

        let md = std::fs::read_to_string(session.md_dir().join("one.md")).unwrap();
        assert!(md.starts_with("# One\n\n## sub\n\n**Jan 05, 2024**\n\n**Likes:** 3\n\n"));
        assert!(md.contains("Body of One."));
        assert!(session.html_dir().join("one.html").is_file());
        assert!(session.html_dir().join("two.html").is_file());

        let ledger = substack2md_archive::load_ledger(&outcome.ledger_path).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[0].title, "One");
        // file_link is the full markdown save path; html_link is relative to
        // the HTML root so the index page's links resolve from disk.
        assert_eq!(
            ledger[0].file_link,
            session.md_dir().join("one.md").to_string_lossy()
        );
        assert_eq!(ledger[0].html_link, format!("{}/one.html", session.writer));

        let index = std::fs::read_to_string(&outcome.index_path).unwrap();
        assert!(index.contains("const essaysData ="));
    }

    #[tokio::test]
    async fn rerun_skips_existing_and_keeps_ledger_stable() {
        let server = MockServer::start().await;
        let base = format!("{}/", server.uri());

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(sitemap(&base, &["one"])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/p/one"))
            .respond_with(ResponseTemplate::new(200).set_body_string(post_page("One", "3")))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let session = session_for(&server, tmp.path(), 0);

        let first = run(&session).await;
        assert_eq!(first.archived, 1);

        let second = run(&session).await;
        assert_eq!(second.archived, 0);
        assert_eq!(second.skipped_existing, 1);

        let ledger = substack2md_archive::load_ledger(&second.ledger_path).unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn limit_bounds_processing() {
        let server = MockServer::start().await;
        let base = format!("{}/", server.uri());

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(sitemap(&base, &["one", "two", "three"])),
            )
            .mount(&server)
            .await;
        for slug in ["one", "two", "three"] {
            Mock::given(method("GET"))
                .and(path(format!("/p/{slug}")))
                .respond_with(ResponseTemplate::new(200).set_body_string(post_page(slug, "1")))
                .mount(&server)
                .await;
        }

        let tmp = tempfile::tempdir().unwrap();
        let session = session_for(&server, tmp.path(), 2);
        let outcome = run(&session).await;

        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.archived, 2);
        assert!(!session.md_dir().join("three.md").exists());
    }

    #[tokio::test]
    async fn paywalled_and_failing_posts_do_not_stop_the_run() {
        let server = MockServer::start().await;
        let base = format!("{}/", server.uri());

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(sitemap(&base, &["open", "gated", "broken"])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/p/open"))
            .respond_with(ResponseTemplate::new(200).set_body_string(post_page("Open", "2")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/p/gated"))
            .respond_with(ResponseTemplate::new(200).set_body_string(gated_page()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/p/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let session = session_for(&server, tmp.path(), 0);
        let outcome = run(&session).await;

        assert_eq!(outcome.processed, 3);
        assert_eq!(outcome.archived, 1);
        assert_eq!(outcome.skipped_paywalled, 1);
        assert_eq!(outcome.failed, 1);

        let ledger = substack2md_archive::load_ledger(&outcome.ledger_path).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].title, "Open");
    }

    #[tokio::test]
    async fn single_post_session_bypasses_discovery() {
        let server = MockServer::start().await;

        // No sitemap mounted; discovery would 404.
        Mock::given(method("GET"))
            .and(path("/p/solo"))
            .respond_with(ResponseTemplate::new(200).set_body_string(post_page("Solo", "9")))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let dirs = DefaultsConfig {
            md_dir: tmp.path().join("md").to_string_lossy().into_owned(),
            html_dir: tmp.path().join("html").to_string_lossy().into_owned(),
            image_dir: tmp.path().join("img").to_string_lossy().into_owned(),
            data_dir: tmp.path().join("data").to_string_lossy().into_owned(),
            timeout_secs: 5,
        };
        let url = Url::parse(&format!("{}/p/solo", server.uri())).unwrap();
        let session = PublicationSession::new(&url, &dirs, false, 0).unwrap();
        assert!(session.single_post.is_some());

        let outcome = run(&session).await;
        assert_eq!(outcome.processed, 1);
        assert_eq!(outcome.archived, 1);
        assert!(session.md_dir().join("solo.md").is_file());
    }
}

//! Archive persistence.
//!
//! Everything that touches disk after conversion lives here: the markdown
//! and HTML artifact files, the per-writer JSON ledger, and the browsable
//! index page. Artifact writes are existence-guarded so reruns never clobber
//! files; the ledger is written atomically through a temp file rename.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use substack2md_shared::{
    ArchiveError, PostSummary, PublicationSession, Result, relative_path,
};

const AUTHOR_TEMPLATE: &str = include_str!("../assets/author_template.html");

/// Write `content` to `path` unless the file already exists.
///
/// Returns `false` when the existing file was kept.
pub fn write_if_absent(path: &Path, content: &str) -> Result<bool> {
    if path.exists() {
        info!(path = %path.display(), "file exists, skipping");
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| ArchiveError::io(path, e))?;
    debug!(path = %path.display(), bytes = content.len(), "file written");
    Ok(true)
}

/// Wrap a rendered HTML fragment in a full page.
///
/// The stylesheet link is relative to `html_dir` so the page works when
/// opened from disk.
pub fn wrap_html_page(title: &str, fragment: &str, html_dir: &Path) -> String {
    let css = relative_path(html_dir, Path::new("assets/css/essay-styles.css"));
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n\
         <link rel=\"stylesheet\" href=\"{css}\">\n\
         </head>\n<body>\n<article class=\"essay\">\n{fragment}\n</article>\n</body>\n</html>\n"
    )
}

/// Load a ledger file. A missing file is an empty ledger; a malformed one
/// is a parse error, never silently discarded.
pub fn load_ledger(path: &Path) -> Result<Vec<PostSummary>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path).map_err(|e| ArchiveError::io(path, e))?;
    serde_json::from_str(&raw)
        .map_err(|e| ArchiveError::parse(format!("{}: {e}", path.display())))
}

/// Append entries not already present, by full-record equality.
///
/// Existing order is preserved; reruns of unchanged posts are no-ops, while
/// a changed field (a new like count, say) produces a second entry.
pub fn merge_entries(mut existing: Vec<PostSummary>, new: Vec<PostSummary>) -> Vec<PostSummary> {
    for entry in new {
        if !existing.contains(&entry) {
            existing.push(entry);
        }
    }
    existing
}

/// Merge `new_entries` into the writer's ledger and write it atomically.
///
/// Returns the merged entries and the ledger path.
pub fn persist_ledger(
    session: &PublicationSession,
    new_entries: Vec<PostSummary>,
) -> Result<(Vec<PostSummary>, PathBuf)> {
    let path = session.ledger_path();
    std::fs::create_dir_all(&session.data_dir)
        .map_err(|e| ArchiveError::io(&session.data_dir, e))?;

    let merged = merge_entries(load_ledger(&path)?, new_entries);
    let json = serde_json::to_string_pretty(&merged)
        .map_err(|e| ArchiveError::parse(format!("ledger serialization: {e}")))?;

    write_atomic(&path, &json)?;
    info!(path = %path.display(), entries = merged.len(), "ledger persisted");
    Ok((merged, path))
}

/// Generate the browsable per-writer index page.
pub fn generate_index_html(
    session: &PublicationSession,
    entries: &[PostSummary],
) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(entries)
        .map_err(|e| ArchiveError::parse(format!("index serialization: {e}")))?;

    let page = AUTHOR_TEMPLATE
        .replace("<!-- AUTHOR_NAME -->", &session.writer)
        .replace("// <!-- ESSAYS_DATA -->", &format!("const essaysData = {json};"));

    std::fs::create_dir_all(&session.html_root)
        .map_err(|e| ArchiveError::io(&session.html_root, e))?;
    let path = session.html_root.join(format!("{}.html", session.writer));
    write_atomic(&path, &page)?;
    info!(path = %path.display(), "index page generated");
    Ok(path)
}

/// Write via a sibling temp file and rename, so readers never observe a
/// half-written file.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| ArchiveError::io(path, std::io::Error::other("path has no file name")))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));
    std::fs::write(&tmp, content).map_err(|e| ArchiveError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| ArchiveError::io(path, e))?;
    Ok(())
}

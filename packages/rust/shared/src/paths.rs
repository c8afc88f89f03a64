//! Filesystem path helpers shared by the image localizer and the archive writer.

use std::path::{Component, Path, PathBuf};

/// Express `to` relative to the directory `from`, using forward slashes.
///
/// Relative inputs are resolved against the working directory first, so a
/// mix of absolute and relative paths (an absolute `--directory` override
/// against the repo-relative stylesheet, say) still differences correctly.
pub fn relative_path(from: &Path, to: &Path) -> String {
    if from.is_absolute() != to.is_absolute() {
        if let Ok(cwd) = std::env::current_dir() {
            return diff(&resolve(&cwd, from), &resolve(&cwd, to));
        }
    }
    diff(from, to)
}

fn resolve(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn diff(from: &Path, to: &Path) -> String {
    let from_parts: Vec<Component<'_>> = from.components().collect();
    let to_parts: Vec<Component<'_>> = to.components().collect();

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    for _ in common..from_parts.len() {
        segments.push("..".to_string());
    }
    for part in &to_parts[common..] {
        segments.push(part.as_os_str().to_string_lossy().into_owned());
    }

    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn sibling_roots() {
        let md = PathBuf::from("substack_md_files/writer");
        let image = PathBuf::from("substack_images/writer/post/pic.png");
        assert_eq!(
            relative_path(&md, &image),
            "../../substack_images/writer/post/pic.png"
        );
    }

    #[test]
    fn shared_prefix_collapses() {
        let from = PathBuf::from("out/html/writer");
        let to = PathBuf::from("out/assets/css/essay-styles.css");
        assert_eq!(relative_path(&from, &to), "../../assets/css/essay-styles.css");
    }

    #[test]
    fn target_below_source() {
        let from = PathBuf::from("out");
        let to = PathBuf::from("out/sub/file.md");
        assert_eq!(relative_path(&from, &to), "sub/file.md");
    }

    #[test]
    fn absolute_source_against_relative_target() {
        let cwd = std::env::current_dir().unwrap();
        let from = cwd.join("out/html/writer");
        let to = PathBuf::from("assets/css/essay-styles.css");
        assert_eq!(
            relative_path(&from, &to),
            "../../../assets/css/essay-styles.css"
        );
    }
}

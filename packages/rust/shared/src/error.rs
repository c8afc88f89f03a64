//! Error types for substack2md.
//!
//! Library crates use [`ArchiveError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all substack2md operations.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during discovery, fetch, or image download.
    #[error("network error: {0}")]
    Network(String),

    /// The post page is missing its required title element.
    #[error("extraction error: {message}")]
    Extraction { message: String },

    /// The login sequence failed verification. Fatal to the whole run.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A bounded poll-until-ready wait ran out of attempts.
    #[error("timed out waiting for {what}")]
    Timeout { what: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Malformed on-disk data (ledger JSON, config TOML).
    #[error("parse error: {message}")]
    Parse { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ArchiveError>;

impl ArchiveError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an extraction error from any displayable message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a timeout error naming the condition that never became true.
    pub fn timeout(what: impl Into<String>) -> Self {
        Self::Timeout { what: what.into() }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ArchiveError::config("missing save directory");
        assert_eq!(err.to_string(), "config error: missing save directory");

        let err = ArchiveError::extraction("no title element found");
        assert!(err.to_string().contains("no title element"));

        let err = ArchiveError::timeout("login session establishment");
        assert_eq!(
            err.to_string(),
            "timed out waiting for login session establishment"
        );
    }
}

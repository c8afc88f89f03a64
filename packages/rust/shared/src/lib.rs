//! Shared types, error model, and configuration for substack2md.
//!
//! This crate is the foundation depended on by all other substack2md crates.

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use config::{AppConfig, AuthConfig, DefaultsConfig, FiltersConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from};
pub use error::{ArchiveError, Result};
pub use paths::relative_path;
pub use types::{PostData, PostSummary, PublicationSession, is_post_url, post_slug,
    publication_root, url_tail, writer_from_url};

//! Application configuration for substack2md.
//!
//! User config lives at `~/.substack2md/substack2md.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "substack2md.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".substack2md";

// ---------------------------------------------------------------------------
// Config structs (matching substack2md.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Save directory defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// URL filtering during discovery.
    #[serde(default)]
    pub filters: FiltersConfig,

    /// Credential sources for the authenticated fetcher.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Root directory for markdown output (per-writer subdirectories).
    #[serde(default = "default_md_dir")]
    pub md_dir: String,

    /// Root directory for standalone HTML output.
    #[serde(default = "default_html_dir")]
    pub html_dir: String,

    /// Root directory for localized images.
    #[serde(default = "default_image_dir")]
    pub image_dir: String,

    /// Directory for the per-writer JSON ledgers.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            md_dir: default_md_dir(),
            html_dir: default_html_dir(),
            image_dir: default_image_dir(),
            data_dir: default_data_dir(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_md_dir() -> String {
    "substack_md_files".into()
}
fn default_html_dir() -> String {
    "substack_html_pages".into()
}
fn default_image_dir() -> String {
    "substack_images".into()
}
fn default_data_dir() -> String {
    "data".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[filters]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltersConfig {
    /// Discovered URLs containing any of these substrings are dropped
    /// (non-post sections of a publication).
    #[serde(default = "default_exclude_keywords")]
    pub exclude_keywords: Vec<String>,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            exclude_keywords: default_exclude_keywords(),
        }
    }
}

fn default_exclude_keywords() -> Vec<String> {
    vec!["about".into(), "archive".into(), "podcast".into()]
}

/// `[auth]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Name of the env var holding the Substack account email
    /// (never store the credential itself).
    #[serde(default = "default_email_env")]
    pub email_env: String,

    /// Name of the env var holding the Substack account password.
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            email_env: default_email_env(),
            password_env: default_password_env(),
        }
    }
}

fn default_email_env() -> String {
    "SUBSTACK_EMAIL".into()
}
fn default_password_env() -> String {
    "SUBSTACK_PASSWORD".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.substack2md/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ArchiveError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.substack2md/substack2md.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ArchiveError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ArchiveError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ArchiveError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ArchiveError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ArchiveError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

//! Client configuration: backend base URL, timeouts, download directory.
//!
//! Sources, later wins: built-in defaults, TOML file, `RESEARCH_API_URL`,
//! then whatever the CLI applies on top.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Environment variable that overrides the backend base URL.
pub const API_URL_ENV: &str = "RESEARCH_API_URL";

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Resolved configuration for [`ResearchClient`](crate::client::ResearchClient).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash.
    pub base_url: String,
    /// TCP connect timeout for every request.
    pub connect_timeout: Duration,
    /// Whole-request timeout for request/response calls. Streams are exempt.
    pub request_timeout: Duration,
    /// Where `/pdf` downloads land when no explicit path is given.
    pub pdf_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            pdf_dir: PathBuf::from("."),
        }
    }
}

/// On-disk shape. Every field is optional so a file can override just one.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    api: ApiSection,
    #[serde(default)]
    downloads: DownloadSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ApiSection {
    base_url: Option<String>,
    connect_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DownloadSection {
    pdf_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Create a config pointing at `base_url` with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            ..Self::default()
        }
    }

    /// Resolve the full layering.
    ///
    /// `explicit` is a `--config` path: it must exist and parse. Without it,
    /// the default location is tried and silently skipped when absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    /// Parse a TOML file on top of the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ClientError::Config {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Self::from_toml_str(&contents).map_err(|detail| ClientError::Config {
            path: path.to_path_buf(),
            detail,
        })
    }

    fn from_toml_str(contents: &str) -> std::result::Result<Self, String> {
        let file: FileConfig = toml::from_str(contents).map_err(|e| e.to_string())?;
        let mut config = Self::default();
        if let Some(url) = file.api.base_url {
            config.base_url = normalize_base_url(&url);
        }
        if let Some(secs) = file.api.connect_timeout_secs {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.api.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = file.downloads.pdf_dir {
            config.pdf_dir = dir;
        }
        Ok(config)
    }

    /// Apply the `RESEARCH_API_URL` value, if set and non-blank.
    pub fn apply_env(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.base_url = normalize_base_url(&url);
        }
    }

    /// Override the base URL (the `--api-url` flag).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = normalize_base_url(url);
        self
    }
}

/// `$HOME/.config/research-chat/config.toml`, or `./config.toml` without a home.
pub fn default_config_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".config/research-chat/config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

//! wblog client configuration
//!
//! Resolution order, last wins:
//! 1. built-in defaults
//! 2. `~/.config/wblog/config.yaml` (or an explicit path)
//! 3. environment: `WBLOG_API_URL`, `WBLOG_SESSION_FILE`, `WBLOG_LOG`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;
use wblog_core::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://wblog-be.onrender.com/";

const ENV_API_URL: &str = "WBLOG_API_URL";
const ENV_SESSION_FILE: &str = "WBLOG_SESSION_FILE";
const ENV_LOG: &str = "WBLOG_LOG";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the blog API
    pub api_url: String,
    /// Where the session is persisted between runs
    pub session_file: Option<PathBuf>,
    /// Cookie carrying the access token
    pub access_cookie: String,
    /// Cookie carrying the refresh token
    pub refresh_cookie: String,
    /// `tracing` filter directive
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_file: None,
            access_cookie: "access_token".to_string(),
            refresh_cookie: "refresh_token".to_string(),
            log_filter: "wblog=info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load from the default location plus environment overrides
    pub fn load() -> Result<Self> {
        let path = config_dir().join("config.yaml");
        Self::load_from(&path)
    }

    /// Load from `path` (missing file means defaults) plus environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(file) = lookup(ENV_SESSION_FILE) {
            self.session_file = Some(PathBuf::from(file));
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }
    }

    /// Check the API URL and normalise it to end in `/`
    pub fn validate(&mut self) -> Result<()> {
        let url = Url::parse(&self.api_url)
            .map_err(|e| Error::Config(format!("invalid api_url '{}': {}", self.api_url, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "api_url must be http(s), got '{}'",
                url.scheme()
            )));
        }

        if !self.api_url.ends_with('/') {
            self.api_url.push('/');
        }

        if self.access_cookie.is_empty() || self.refresh_cookie.is_empty() {
            return Err(Error::Config("cookie names must not be empty".to_string()));
        }

        Ok(())
    }

    /// Parsed base URL
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.api_url).map_err(|e| Error::Config(e.to_string()))
    }

    /// Session file, defaulting to `~/.config/wblog/session.json`
    pub fn session_path(&self) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(|| config_dir().join("session.json"))
    }
}

/// `~/.config/wblog` (platform equivalent), `./.wblog` when unknown
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("wblog"))
        .unwrap_or_else(|| PathBuf::from(".wblog"))
}

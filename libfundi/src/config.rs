//! Configuration management for the Fundi client

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub paging: PagingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Bearer token sent with every request; redacted in `Debug` output
    #[serde(default)]
    pub token: Option<SecretString>,
    /// humantime duration, e.g. "30s" or "1m"
    #[serde(default)]
    pub request_timeout: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Items from the end of a list at which to request the next page
    #[serde(default = "default_load_more_threshold")]
    pub load_more_threshold: usize,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_load_more_threshold() -> usize {
    3
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            load_more_threshold: default_load_more_threshold(),
        }
    }
}

impl ApiConfig {
    /// Parsed request timeout, if one is configured
    pub fn timeout(&self) -> Result<Option<Duration>> {
        match self.request_timeout.as_deref() {
            None => Ok(None),
            Some(raw) => humantime::parse_duration(raw)
                .map(Some)
                .map_err(|e| {
                    ConfigError::InvalidValue {
                        field: "api.request_timeout".to_string(),
                        reason: format!("'{}' is not a duration ({})", raw, e),
                    }
                    .into()
                }),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// Environment overrides (`FUNDI_API_URL`, `FUNDI_API_TOKEN`) are applied
    /// after the file is read.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        let mut config = Self::load_from_path(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            api: ApiConfig {
                base_url: "https://api.fundi.example/v1".to_string(),
                token: None,
                request_timeout: Some("30s".to_string()),
                user_agent: None,
            },
            paging: PagingConfig::default(),
        }
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("FUNDI_API_URL") {
            if !url.trim().is_empty() {
                self.api.base_url = url.trim().to_string();
            }
        }
        if let Ok(token) = std::env::var("FUNDI_API_TOKEN") {
            if !token.trim().is_empty() {
                self.api.token = Some(SecretString::from(token.trim()));
            }
        }
    }

    /// Check values the client depends on
    pub fn validate(&self) -> Result<()> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::MissingField("api.base_url".to_string()).into());
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api.base_url".to_string(),
                reason: format!("'{}' must start with http:// or https://", base_url),
            }
            .into());
        }
        if self.paging.page_size == 0 || self.paging.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "paging.page_size".to_string(),
                reason: format!("must be between 1 and {}", MAX_PAGE_SIZE),
            }
            .into());
        }
        self.api.timeout()?;
        Ok(())
    }
}

/// Resolve the configuration file path following XDG Base Directory conventions
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("FUNDI_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("fundi").join("config.toml"))
}

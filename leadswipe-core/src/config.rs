//! Application configuration.
//!
//! Values come from an optional TOML file and are then overridden by
//! environment variables. A missing file is fine; a missing backend URL or
//! key after both sources have been applied is not.

use crate::error::{ConfigError, CoreError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

pub const CONFIG_PATH_VAR: &str = "LEADSWIPE_CONFIG";
pub const BACKEND_URL_VAR: &str = "LEADSWIPE_BACKEND_URL";
pub const BACKEND_KEY_VAR: &str = "LEADSWIPE_BACKEND_ANON_KEY";
pub const PAGE_SIZE_VAR: &str = "LEADSWIPE_PAGE_SIZE";
pub const DEFAULT_CONFIG_FILE: &str = "leadswipe.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Leads fetched per load.
    pub page_size: u32,
    /// Maximum number of decisions kept for undo.
    pub undo_limit: usize,
    /// Drag distance in logical pixels that commits a swipe.
    pub swipe_threshold: f32,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            undo_limit: 50,
            swipe_threshold: 100.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub review: ReviewConfig,
}

impl AppConfig {
    /// Loads from the file named by `LEADSWIPE_CONFIG` (or `leadswipe.toml`)
    /// and the process environment.
    pub fn load() -> Result<Self, CoreError> {
        let path = std::env::var(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path, |name| std::env::var(name).ok())
    }

    pub fn load_from<F>(path: &Path, env: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {}, using defaults", path.display());
                None
            }
            Err(e) => return Err(CoreError::Io(e)),
        };
        Self::from_sources(contents.as_deref(), env)
    }

    pub fn from_sources<F>(file_contents: Option<&str>, env: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: AppConfig = match file_contents {
            Some(contents) => toml::from_str(contents).map_err(ConfigError::from)?,
            None => AppConfig::default(),
        };

        if let Some(url) = env(BACKEND_URL_VAR) {
            config.backend.url = url;
        }
        if let Some(key) = env(BACKEND_KEY_VAR) {
            config.backend.anon_key = key;
        }
        if let Some(page_size) = env(PAGE_SIZE_VAR) {
            config.review.page_size =
                page_size
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: "review.page_size".to_string(),
                        value: page_size.clone(),
                    })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "backend.url".to_string(),
            });
        }
        let url = Url::parse(&self.backend.url).map_err(|_| ConfigError::InvalidValue {
            field: "backend.url".to_string(),
            value: self.backend.url.clone(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "backend.url".to_string(),
                value: self.backend.url.clone(),
            });
        }
        if self.backend.anon_key.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "backend.anon_key".to_string(),
            });
        }
        if self.backend.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "backend.request_timeout_secs must be at least 1".to_string(),
            });
        }
        if self.review.page_size == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "review.page_size must be at least 1".to_string(),
            });
        }
        if self.review.undo_limit == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "review.undo_limit must be at least 1".to_string(),
            });
        }
        if self.review.swipe_threshold.is_nan() || self.review.swipe_threshold <= 0.0 {
            return Err(ConfigError::ValidationFailed {
                reason: "review.swipe_threshold must be positive".to_string(),
            });
        }
        Ok(())
    }
}

//! Client configuration.
//!
//! The publishable key is required; everything else has a default. A config
//! that fails [`ClientConfig::validate`] must stop startup.

use pantry_cache::CacheConfig;
use serde::Deserialize;
use std::path::Path;

/// API origin used when none is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// API origin. Falls back to [`DEFAULT_API_URL`] when unset.
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Identity-provider publishable key.
    #[serde(default)]
    pub publishable_key: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_credential_timeout_ms")]
    pub credential_timeout_ms: u64,
    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_credential_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing identity publishable key (set publishable_key or PANTRY_PUBLISHABLE_KEY)")]
    MissingPublishableKey,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    /// Minimal config pointing at `api_base_url`.
    pub fn new(api_base_url: Option<String>, publishable_key: impl Into<String>) -> Self {
        Self {
            api_base_url,
            publishable_key: publishable_key.into(),
            request_timeout_ms: default_request_timeout_ms(),
            credential_timeout_ms: default_credential_timeout_ms(),
            cache: CacheConfig::default(),
        }
    }

    /// Load from `path` (the CLI's `--config`), then `PANTRY_CONFIG`, then
    /// the `PANTRY_*` environment, and validate the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) reading variables through `lookup`.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_var = lookup("PANTRY_CONFIG").filter(|v| !v.trim().is_empty());
        let config = match (path, from_var) {
            (Some(path), _) => Self::from_path(path)?,
            (None, Some(path)) => Self::from_path(Path::new(&path))?,
            (None, None) => Self::from_lookup(lookup)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from `PANTRY_*` variables using `lookup` to read them.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(
            lookup("PANTRY_API_URL").filter(|v| !v.trim().is_empty()),
            lookup("PANTRY_PUBLISHABLE_KEY").unwrap_or_default(),
        );
        if let Some(value) = lookup("PANTRY_REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = parse_ms("request_timeout_ms", &value)?;
        }
        if let Some(value) = lookup("PANTRY_CREDENTIAL_TIMEOUT_MS") {
            config.credential_timeout_ms = parse_ms("credential_timeout_ms", &value)?;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.publishable_key.trim().is_empty() {
            return Err(ConfigError::MissingPublishableKey);
        }
        if let Some(url) = &self.api_base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: "api_base_url",
                    reason: "must be an http(s) origin".to_string(),
                });
            }
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.credential_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "credential_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.cache.max_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.max_entries",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Effective API origin, without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
    }
}

fn parse_ms(field: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            field,
            reason: format!("'{}' is not a number of milliseconds", value),
        })
}

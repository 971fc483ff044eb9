//! Configuration loading for the news aggregator client.
//!
//! Every field has a default matching the reference deployment, so a missing
//! file is not an error. A file that is present must parse and validate.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use newsagg_core::DEFAULT_ERROR_MESSAGE;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "NEWSAGG_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL every request path is appended to.
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    /// Directory holding the persisted session.
    pub session_dir: PathBuf,
    /// Message used when an error response carries none.
    pub fallback_error_message: String,
    /// Route navigated to after the server rejects the credential.
    pub login_route: String,
    /// Unauthenticated entry routes; no redirect happens from these.
    pub public_routes: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api/v1".to_string(),
            request_timeout_ms: 15_000,
            session_dir: PathBuf::from(".newsagg"),
            fallback_error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            login_route: "/login".to_string(),
            public_routes: vec!["/login".to_string(), "/daftar".to_string()],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    /// Load from `path`, else `NEWSAGG_CONFIG`, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).or_else(config_path_from_env);
        let config = match path {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must be an http(s) URL".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.fallback_error_message.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "fallback_error_message",
                reason: "must not be empty".to_string(),
            });
        }
        if !self.login_route.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "login_route",
                reason: "must start with '/'".to_string(),
            });
        }
        if self.session_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "session_dir",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV).ok().map(PathBuf::from)
}

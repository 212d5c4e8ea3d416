//! Typed client configuration
//!
//! Parsed from `knocki.yaml`, then overlaid with `KNOCKI_*` environment
//! variables.

use knocki_core::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_WEBSOCKET_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::loader::YamlLoader;

pub const DEFAULT_CONFIG_FILE: &str = "knocki.yaml";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KnockiConfig {
    /// REST endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// WebSocket endpoint
    #[serde(default = "default_websocket_url")]
    pub websocket_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Token from a previous login
    #[serde(default)]
    pub token: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_websocket_url() -> String {
    DEFAULT_WEBSOCKET_URL.to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for KnockiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            websocket_url: default_websocket_url(),
            request_timeout: default_request_timeout(),
            email: None,
            password: None,
            token: None,
        }
    }
}

impl KnockiConfig {
    /// Load `file` from `config_dir`, apply environment overrides and validate.
    ///
    /// A missing file is not an error; defaults and the environment are used instead.
    pub fn load(config_dir: impl Into<PathBuf>, file: impl AsRef<Path>) -> ConfigResult<Self> {
        let loader = YamlLoader::new(config_dir)?;
        let path = loader.config_dir().join(file.as_ref());

        let mut config = if path.exists() {
            Self::from_value(loader.load_file(&path)?, &path)?
        } else {
            debug!("No config file at {:?}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from YAML text without environment overrides
    pub fn from_yaml_str(config_dir: impl Into<PathBuf>, content: &str) -> ConfigResult<Self> {
        let loader = YamlLoader::new(config_dir)?;
        let source = Path::new(DEFAULT_CONFIG_FILE);
        let config = Self::from_value(loader.load_string(content, source)?, source)?;
        config.validate()?;
        Ok(config)
    }

    fn from_value(value: serde_yaml::Value, source: &Path) -> ConfigResult<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value).map_err(|e| ConfigError::ParseYaml {
            path: source.to_path_buf(),
            source: e,
        })
    }

    /// Overlay `KNOCKI_BASE_URL`, `KNOCKI_WEBSOCKET_URL`, `KNOCKI_TOKEN` and
    /// `KNOCKI_REQUEST_TIMEOUT`
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        if let Ok(url) = std::env::var("KNOCKI_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(url) = std::env::var("KNOCKI_WEBSOCKET_URL") {
            self.websocket_url = url;
        }
        if let Ok(token) = std::env::var("KNOCKI_TOKEN") {
            self.token = Some(token);
        }
        if let Ok(timeout) = std::env::var("KNOCKI_REQUEST_TIMEOUT") {
            self.request_timeout =
                timeout
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: "KNOCKI_REQUEST_TIMEOUT".to_string(),
                        reason: format!("'{}' is not a number of seconds", timeout),
                    })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !has_scheme(&self.base_url, &["http://", "https://"]) {
            return Err(ConfigError::InvalidValue {
                key: "base_url".to_string(),
                reason: format!("'{}' must be an http(s) URL", self.base_url),
            });
        }
        if !has_scheme(&self.websocket_url, &["ws://", "wss://"]) {
            return Err(ConfigError::InvalidValue {
                key: "websocket_url".to_string(),
                reason: format!("'{}' must be a ws(s) URL", self.websocket_url),
            });
        }
        if self.request_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                key: "request_timeout".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Email and password, when both are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.email.as_deref()?, self.password.as_deref()?))
    }
}

fn has_scheme(url: &str, schemes: &[&str]) -> bool {
    schemes
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme))
}

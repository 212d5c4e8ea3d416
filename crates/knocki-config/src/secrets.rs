//! Secrets loader
//!
//! Loads secrets from secrets.yaml so credentials stay out of knocki.yaml.

use crate::error::{ConfigError, ConfigResult};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Secrets store loaded from secrets.yaml
#[derive(Debug, Clone)]
pub struct Secrets {
    secrets: HashMap<String, String>,
}

impl Secrets {
    /// Load secrets from `secrets.yaml` in `config_dir`. A missing file yields an empty store.
    pub fn load(config_dir: &Path) -> ConfigResult<Self> {
        let path = config_dir.join("secrets.yaml");

        if !path.exists() {
            debug!("No secrets.yaml found at {:?}, using empty secrets", path);
            return Ok(Self {
                secrets: HashMap::new(),
            });
        }

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::ReadFile {
            path: path.clone(),
            source: e,
        })?;

        let parse_error = |e| ConfigError::ParseYaml {
            path: path.clone(),
            source: e,
        };
        let value: serde_yaml::Value = serde_yaml::from_str(&content).map_err(parse_error)?;
        // An empty file parses as null
        let raw: HashMap<String, serde_yaml::Value> = if value.is_null() {
            HashMap::new()
        } else {
            serde_yaml::from_value(value).map_err(parse_error)?
        };

        let secrets: HashMap<String, String> = raw
            .into_iter()
            .map(|(k, v)| {
                let str_value = match v {
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    serde_yaml::Value::Null => String::new(),
                    _ => serde_yaml::to_string(&v)
                        .unwrap_or_default()
                        .trim()
                        .to_string(),
                };
                (k, str_value)
            })
            .collect();

        debug!("Loaded {} secrets from {:?}", secrets.len(), path);

        Ok(Self { secrets })
    }

    /// Value of `key`, or `SecretNotFound`
    pub fn get(&self, key: &str) -> ConfigResult<&str> {
        self.secrets
            .get(key)
            .map(|s| s.as_str())
            .ok_or_else(|| ConfigError::SecretNotFound {
                key: key.to_string(),
            })
    }

    /// Whether `key` is defined
    pub fn contains(&self, key: &str) -> bool {
        self.secrets.contains_key(key)
    }

    /// Number of secrets loaded
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

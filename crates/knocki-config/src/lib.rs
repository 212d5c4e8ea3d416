//! YAML configuration for the Knocki client
//!
//! Configuration lives in `knocki.yaml` and supports two custom tags:
//!
//! - `!secret key` - Substitute from secrets.yaml in the same directory
//! - `!env_var VAR` - Environment variable substitution
//!
//! # Example
//!
//! ```ignore
//! use knocki_config::KnockiConfig;
//!
//! let config = KnockiConfig::load("/config", "knocki.yaml")?;
//! ```

mod client_config;
mod error;
mod loader;
mod secrets;

pub use client_config::{KnockiConfig, DEFAULT_CONFIG_FILE};
pub use error::{ConfigError, ConfigResult};
pub use loader::YamlLoader;
pub use secrets::Secrets;

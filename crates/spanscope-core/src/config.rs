//! Configuration management for Spanscope
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `SPANSCOPE_<SECTION>__<KEY>` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Query backend configuration
    pub backend: BackendConfig,

    /// Query construction limits
    pub query: QueryConfig,

    /// Credential discovery
    pub credentials: CredentialConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// An explicit `path` must exist; the platform default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?);

        match path {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration file");
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => {
                if let Some(path) = default_config_path() {
                    builder = builder
                        .add_source(File::from(path).format(FileFormat::Toml).required(false));
                }
            }
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("SPANSCOPE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Platform configuration file (`<config dir>/spanscope/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "spanscope", "spanscope")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Query backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the query API; derived from the token region when unset
    pub base_url: Option<String>,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Query construction limits
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum length of any caller-supplied filter value
    pub max_filter_len: usize,
    /// Upper bound applied to every result limit
    pub max_limit: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_filter_len: 500,
            max_limit: 1000,
        }
    }
}

/// Credential discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Environment variable (and `.env` key) holding the read token
    pub env_var: String,
    /// Additional `.env` files searched after `./.env` and `~/.env`
    pub extra_paths: Vec<PathBuf>,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            env_var: "LOGFIRE_READ_TOKEN".to_string(),
            extra_paths: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        }
    }
}

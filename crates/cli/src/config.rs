//! Configuration management for the CLI
//!
//! Values are layered: built-in defaults, then `~/.config/teraops/config.json`,
//! then `TERAOPS_*` environment variables. Command-line flags are applied on
//! top by the caller.

use anyhow::{Context, Result};
use optimizer_lib::DEFAULT_STRATEGY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix (e.g. `TERAOPS_API_URL`)
const ENV_PREFIX: &str = "TERAOPS";

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Optimization backend URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Strategy used when `--strategy` is not given
    #[serde(default = "default_strategy")]
    pub default_strategy: String,

    /// Seconds between status checks
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Give up after this many status checks
    #[serde(default)]
    pub max_polls: Option<u32>,

    /// Give up when the job has not finished after this many seconds
    #[serde(default)]
    pub deadline_secs: Option<u64>,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_strategy() -> String {
    DEFAULT_STRATEGY.to_string()
}

fn default_poll_interval() -> u64 {
    2
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            default_strategy: default_strategy(),
            poll_interval_secs: default_poll_interval(),
            max_polls: None,
            deadline_secs: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl CliConfig {
    /// Load configuration from the user config file and environment
    pub fn load() -> Result<Self> {
        let path = Self::config_path().ok();
        Self::load_from(path.as_deref())
    }

    /// Load configuration from an explicit file (if any) and environment
    ///
    /// A missing file is not an error.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(false),
            );
        }

        let config = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("teraops").join("config.json"))
    }
}

//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/revwiki/config.toml, or WIKI_CONFIG)
//! 3. Environment variables (WIKI_* prefix)
//!
//! Environment variables take precedence over config file values. The CLI's
//! `--db` flag is applied last, in `main`.

use crate::db::WikiError;
use crate::deadline::Deadline;
use crate::pool::PoolConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const ENV_PREFIX: &str = "WIKI";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Deadline for a single command, in seconds. 0 disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub pool: PoolConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            timeout_secs: default_timeout_secs(),
            pool: PoolConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location and environment.
    pub fn load() -> Result<Self, WikiError> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path. A missing file means
    /// defaults; environment overrides apply either way.
    pub fn load_from_path(path: &Path) -> Result<Self, WikiError> {
        let mut config = if path.exists() {
            tracing::debug!(path = %path.display(), "reading config file");
            let content = std::fs::read_to_string(path).map_err(|e| {
                WikiError::Config(format!("Failed to read config file {:?}: {}", path, e))
            })?;
            toml::from_str(&content).map_err(|e| {
                WikiError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self, WikiError> {
        let mut config: Config = toml::from_str(toml_content)
            .map_err(|e| WikiError::Config(format!("Failed to parse config TOML: {}", e)))?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), WikiError> {
        if let Some(val) = env_var("DATABASE_PATH") {
            self.database_path = PathBuf::from(val);
        }
        if let Some(n) = env_parse("MAX_OPEN_CONNS")? {
            self.pool.max_open_conns = n;
        }
        if let Some(n) = env_parse("MIN_IDLE_CONNS")? {
            self.pool.min_idle_conns = n;
        }
        if let Some(n) = env_parse("IDLE_TIMEOUT_SECS")? {
            self.pool.idle_timeout_secs = n;
        }
        if let Some(n) = env_parse("ACQUIRE_TIMEOUT_MS")? {
            self.pool.acquire_timeout_ms = n;
        }
        if let Some(n) = env_parse("TIMEOUT_SECS")? {
            self.timeout_secs = n;
        }
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with the WIKI_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Some(path) = env_var("CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("revwiki")
            .join("config.toml")
    }

    /// A fresh deadline for one command.
    pub fn deadline(&self) -> Deadline {
        match self.timeout_secs {
            0 => Deadline::none(),
            secs => Deadline::after(Duration::from_secs(secs)),
        }
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, suffix)).ok()
}

fn env_parse<T: FromStr>(suffix: &str) -> Result<Option<T>, WikiError> {
    match env_var(suffix) {
        None => Ok(None),
        Some(val) => val.trim().parse().map(Some).map_err(|_| {
            WikiError::Config(format!(
                "{}_{} must be a non-negative integer, got '{}'",
                ENV_PREFIX, suffix, val
            ))
        }),
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("revwiki")
        .join("wiki.db")
}

fn default_timeout_secs() -> u64 {
    30
}

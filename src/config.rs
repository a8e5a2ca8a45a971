use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::health::DEFAULT_STALE_AFTER_DAYS;

pub const APP_ID: &str = "vivi";

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join(APP_ID)
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join(APP_ID)
        .join("config.json")
}

fn default_user_agent() -> String {
    format!("{}/{}", APP_ID, env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Upper bound on a single page-title fetch.
    pub fetch_timeout_secs: u64,
    pub stale_after_days: i64,
    /// Retry the fetch for links that only carry a fallback title.
    pub refresh_fallback_titles: bool,
    pub debug_logging: bool,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            fetch_timeout_secs: 5,
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
            refresh_fallback_titles: true,
            debug_logging: false,
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        default_config_path()
    }

    /// Load from the default location. A missing file gives the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&default_config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?).map_err(io_err)
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("vivi.json")
    }

    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Ensure the data directory exists.
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_dir).map_err(|source| ConfigError::Io {
            path: self.data_dir.clone(),
            source,
        })
    }
}

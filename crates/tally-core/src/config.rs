//! Runtime configuration
//!
//! Settings come from an optional TOML file. Lookup order:
//! 1. An explicit path (CLI `--config`)
//! 2. `<data_dir>/config.toml`
//! 3. Built-in defaults
//!
//! Example:
//!
//! ```toml
//! data_dir = "/home/me/.local/share/tally"
//!
//! [database]
//! pool_size = 8
//! busy_timeout_ms = 5000
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "TALLY_DATA_DIR";

/// Config file name looked up inside the data directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

const DEFAULT_POOL_SIZE: u32 = 8;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Resolved configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Root directory holding `db/central.db`
    pub data_dir: PathBuf,
    /// Maximum pooled connections
    pub pool_size: u32,
    /// How long a writer waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            pool_size: DEFAULT_POOL_SIZE,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Defaults rooted at a specific data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Resolve configuration from an optional explicit file and data directory
    ///
    /// An explicit `data_dir` always wins over the one in the file.
    pub fn resolve(config_path: Option<&Path>, data_dir: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::load(path)?,
            None => {
                let dir = data_dir
                    .map(Path::to_path_buf)
                    .unwrap_or_else(default_data_dir);
                let candidate = dir.join(CONFIG_FILE_NAME);
                if candidate.exists() {
                    Self::load(&candidate)?
                } else {
                    Self::with_data_dir(dir)
                }
            }
        };

        if let Some(dir) = data_dir {
            config.data_dir = dir.to_path_buf();
        }

        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        debug!("Loaded config from {}", path.display());
        parse_config(&content)
    }

    /// Path of the ledger database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("db").join("central.db")
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::Config("pool_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Platform data directory (`~/.local/share/tally` on Linux)
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally")
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    data_dir: Option<PathBuf>,
    database: Option<RawDatabase>,
}

#[derive(Debug, Deserialize)]
struct RawDatabase {
    pool_size: Option<u32>,
    busy_timeout_ms: Option<u64>,
}

fn parse_config(content: &str) -> Result<Config> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = Config::default();

    if let Some(dir) = raw.data_dir {
        config.data_dir = dir;
    }
    if let Some(database) = raw.database {
        if let Some(size) = database.pool_size {
            config.pool_size = size;
        }
        if let Some(timeout) = database.busy_timeout_ms {
            config.busy_timeout_ms = timeout;
        }
    }

    config.validate()?;
    Ok(config)
}

//! Engine configuration.
//!
//! # Responsibility
//! - Enumerate deployment options with defaults.
//! - Load options from JSON and validate them once at startup.
//!
//! # Invariants
//! - Grapheme and logogram archives never share a directory.
//! - `create_wait_timeout_ms` is positive.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CREATE_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Deployment options for `LogogramEngine`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// SQLite file backing the grapheme store; `None` keeps it in memory.
    pub database_path: Option<PathBuf>,
    /// Directory for standalone grapheme SVGs; `None` disables archival.
    pub grapheme_archive_dir: Option<PathBuf>,
    /// Directory for composed logogram SVGs; `None` disables archival.
    pub logogram_archive_dir: Option<PathBuf>,
    /// Bounded wait for another request's in-flight creation of the same word.
    pub create_wait_timeout_ms: u64,
    /// Log level for `init_logging`; defaults by build mode when unset.
    pub log_level: Option<String>,
    /// Absolute log directory; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            grapheme_archive_dir: None,
            logogram_archive_dir: None,
            create_wait_timeout_ms: DEFAULT_CREATE_WAIT_TIMEOUT_MS,
            log_level: None,
            log_dir: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config JSON: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.create_wait_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "create_wait_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if let (Some(graphemes), Some(logograms)) =
            (&self.grapheme_archive_dir, &self.logogram_archive_dir)
        {
            if graphemes == logograms {
                return Err(ConfigError::Invalid(format!(
                    "grapheme and logogram archives must use distinct directories, both are `{}`",
                    graphemes.display()
                )));
            }
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    pub fn create_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.create_wait_timeout_ms)
    }
}

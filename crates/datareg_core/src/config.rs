//! Runtime configuration for catalog processes.
//!
//! # Responsibility
//! - Resolve storage path, log settings and page size from the environment.
//!
//! # Invariants
//! - Every setting has a default; only malformed values are errors.
//! - `page_size` is always at least 1.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "DATAREG_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "DATAREG_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "DATAREG_LOG_DIR";
pub const PAGE_SIZE_VAR: &str = "DATAREG_PAGE_SIZE";

pub const DEFAULT_DB_PATH: &str = "datareg.sqlite3";
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Malformed configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { var, value, reason } => {
                write!(f, "invalid value `{value}` for {var}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Resolved process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub db_path: PathBuf,
    pub log_level: &'static str,
    /// File logging directory; `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
    pub page_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: default_log_level(),
            log_dir: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CatalogConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let read = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        if let Some(path) = read(DB_PATH_VAR) {
            config.db_path = PathBuf::from(path.trim());
        }

        if let Some(level) = read(LOG_LEVEL_VAR) {
            config.log_level = normalize_level(&level).map_err(|err| ConfigError::InvalidValue {
                var: LOG_LEVEL_VAR,
                value: level.clone(),
                reason: err.to_string(),
            })?;
        }

        if let Some(dir) = read(LOG_DIR_VAR) {
            config.log_dir = Some(PathBuf::from(dir.trim()));
        }

        if let Some(raw) = read(PAGE_SIZE_VAR) {
            config.page_size = match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => size,
                Ok(_) => {
                    return Err(ConfigError::InvalidValue {
                        var: PAGE_SIZE_VAR,
                        value: raw,
                        reason: "must be at least 1".to_string(),
                    })
                }
                Err(err) => {
                    return Err(ConfigError::InvalidValue {
                        var: PAGE_SIZE_VAR,
                        value: raw,
                        reason: err.to_string(),
                    })
                }
            };
        }

        Ok(config)
    }
}

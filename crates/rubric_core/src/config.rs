//! Host-supplied runtime configuration.
//!
//! # Responsibility
//! - Describe logging and storage settings as one JSON document.
//! - Open the configured database.
//!
//! # Invariants
//! - Every field has a default; `{}` is a valid configuration.
//! - Unknown keys are rejected so typos do not silently fall back.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::default_log_level;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Top-level rubric core configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
}

/// Logging settings consumed by [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files; stderr when absent.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite file; in-memory database when absent.
    pub db_path: Option<PathBuf>,
}

/// Configuration loading failure.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, .. } => {
                write!(f, "failed to read config `{}`", path.display())
            }
            Self::Parse(_) => write!(f, "invalid config"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}

impl CoreConfig {
    /// Parses a JSON configuration document.
    pub fn from_json_str(value: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(value).map_err(ConfigError::Parse)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Opens and migrates the configured database.
    pub fn open_db(&self) -> DbResult<Connection> {
        match &self.storage.db_path {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use crate::db::{latest_version, schema_version};
    use std::path::PathBuf;

    #[test]
    fn empty_document_yields_defaults() {
        let config = CoreConfig::from_json_str("{}").expect("empty config should parse");
        assert_eq!(config, CoreConfig::default());
        assert!(config.storage.db_path.is_none());
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = CoreConfig::from_json_str(
            r#"{ "logging": { "level": "warn" }, "storage": { "db_path": "/tmp/rubrics.db" } }"#,
        )
        .expect("partial config should parse");
        assert_eq!(config.logging.level, "warn");
        assert!(config.logging.log_dir.is_none());
        assert_eq!(
            config.storage.db_path,
            Some(PathBuf::from("/tmp/rubrics.db"))
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = CoreConfig::from_json_str(r#"{ "storage": { "path": "x.db" } }"#)
            .expect_err("unknown key should fail");
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let error = CoreConfig::load("/definitely/not/here/rubric.json")
            .expect_err("missing file should fail");
        assert!(error.to_string().contains("/definitely/not/here/rubric.json"));
    }

    #[test]
    fn default_storage_opens_migrated_memory_db() {
        let conn = CoreConfig::default()
            .open_db()
            .expect("in-memory db should open");
        assert_eq!(schema_version(&conn).unwrap(), latest_version());
    }
}

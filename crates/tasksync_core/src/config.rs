//! Core runtime configuration.
//!
//! # Responsibility
//! - Load storage, logging and remote-sync settings from a TOML file.
//! - Apply `TASKSYNC_*` environment overrides on top of file values.
//!
//! # Invariants
//! - Every field has a default; an empty file is a valid configuration.
//! - A loaded configuration has passed `validate()`.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_STORAGE_PATH: &str = "data/tasks.json";
pub const ENV_STORAGE_PATH: &str = "TASKSYNC_STORAGE_PATH";
pub const ENV_LOG_LEVEL: &str = "TASKSYNC_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TASKSYNC_LOG_DIR";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config syntax: {err}"),
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

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Remote sync settings; presence enables a sync attempt at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSyncConfig {
    /// Credentials locator handed to the remote connector.
    pub credentials: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub storage_path: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling logs. `None` leaves logging off.
    pub log_dir: Option<PathBuf>,
    pub remote: Option<RemoteSyncConfig>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            log_level: default_log_level().to_string(),
            log_dir: None,
            remote: None,
        }
    }
}

impl CoreConfig {
    /// Reads `path`, applies environment overrides and validates.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Like `load`, but a missing file yields defaults (plus overrides).
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Applies overrides from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_STORAGE_PATH).filter(|value| !value.trim().is_empty()) {
            self.storage_path = PathBuf::from(path.trim());
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|value| !value.trim().is_empty()) {
            self.log_level = level.trim().to_string();
        }
        if let Some(dir) = lookup(ENV_LOG_DIR).filter(|value| !value.trim().is_empty()) {
            self.log_dir = Some(PathBuf::from(dir.trim()));
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.storage_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("storage_path cannot be empty".to_string()));
        }
        if let Some(remote) = &self.remote {
            if remote.credentials.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "remote.credentials cannot be empty".to_string(),
                ));
            }
            if remote.user_id.trim().is_empty() {
                return Err(ConfigError::Invalid("remote.user_id cannot be empty".to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, RemoteSyncConfig, ENV_LOG_DIR, ENV_STORAGE_PATH};
    use std::path::PathBuf;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.storage_path, PathBuf::from("data/tasks.json"));
        assert!(config.remote.is_none());
    }

    #[test]
    fn parses_remote_table() {
        let config = CoreConfig::from_toml_str(
            r#"
            storage_path = "/var/lib/tasks/tasks.json"
            log_level = "warn"

            [remote]
            credentials = "/etc/tasksync/credentials.json"
            user_id = "user-42"
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "warn");
        assert_eq!(
            config.remote,
            Some(RemoteSyncConfig {
                credentials: "/etc/tasksync/credentials.json".to_string(),
                user_id: "user-42".to_string(),
            })
        );
        config.validate().unwrap();
    }

    #[test]
    fn overrides_replace_file_values_and_ignore_blanks() {
        let mut config = CoreConfig::default();
        config.apply_overrides(|key| match key {
            ENV_STORAGE_PATH => Some(" /tmp/tasks.json ".to_string()),
            ENV_LOG_DIR => Some("   ".to_string()),
            _ => None,
        });

        assert_eq!(config.storage_path, PathBuf::from("/tmp/tasks.json"));
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn validate_rejects_blank_remote_user() {
        let config = CoreConfig {
            remote: Some(RemoteSyncConfig {
                credentials: "creds.json".to_string(),
                user_id: " ".to_string(),
            }),
            ..CoreConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_document_is_parse_error() {
        let err = CoreConfig::from_toml_str("storage_path = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CoreConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

//! Application configuration.
//!
//! Configuration is a single YAML file with serde defaults for every
//! field, discovered from (highest priority first) an explicit path,
//! the `TASKBOARD_CONFIG_PATH` environment variable, `taskboard.yaml`
//! in the working directory, and a user-level config under the platform
//! config directory. CLI flags override file values in `main`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default port for the web server.
pub const DEFAULT_PORT: u16 = 8080;

/// Default session lifetime: two weeks.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 14 * 24 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

/// HTTP server and storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Session lifetime in minutes.
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            host: default_host(),
            port: default_port(),
            session_ttl_minutes: default_session_ttl_minutes(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("taskboard.db")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_session_ttl_minutes() -> i64 {
    DEFAULT_SESSION_TTL_MINUTES
}

impl ServerConfig {
    /// Session lifetime in milliseconds, for session row expiry.
    pub fn session_ttl_ms(&self) -> i64 {
        self.session_ttl_minutes * 60 * 1000
    }
}

impl Config {
    /// Load configuration. An explicitly given path must exist; the
    /// discovered locations are optional and fall through to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var("TASKBOARD_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(ConfigError::NotFound(path));
            }
            return Self::from_file(&path);
        }

        let project = PathBuf::from("taskboard.yaml");
        if project.exists() {
            return Self::from_file(&project);
        }

        if let Some(user_path) = dirs::config_dir().map(|d| d.join("taskboard").join("config.yaml"))
        {
            if user_path.exists() {
                return Self::from_file(&user_path);
            }
        }

        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.server.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: Config = serde_yaml::from_str("server:\n  port: 9000\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.db_path, PathBuf::from("taskboard.db"));
        assert_eq!(
            config.server.session_ttl_minutes,
            DEFAULT_SESSION_TTL_MINUTES
        );
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
    }

    #[test]
    fn ttl_converts_to_milliseconds() {
        let server = ServerConfig {
            session_ttl_minutes: 1,
            ..Default::default()
        };
        assert_eq!(server.session_ttl_ms(), 60_000);
    }
}

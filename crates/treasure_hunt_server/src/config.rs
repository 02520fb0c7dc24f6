//! Server configuration.
//!
//! Layered as defaults, then an optional TOML file, then environment
//! variables, then command-line flags (applied by the binary).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use treasure_hunt::SETTING_KEYS;

/// Process-level configuration for the game server.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    port: u16,

    /// Directory holding the SQLite database.
    #[serde(default = "default_data_dir")]
    data_dir: PathBuf,

    /// Database file name inside `data_dir`.
    #[serde(default = "default_database_file")]
    database_file: String,

    /// Key for signing team session cookies.
    #[serde(default = "default_secret_key")]
    secret_key: String,

    /// Shared admin password for Basic Auth. Empty disables the admin area.
    #[serde(default = "default_admin_password")]
    admin_password: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_database_file() -> String {
    "game.db".to_string()
}

fn default_secret_key() -> String {
    "dev-secret".to_string()
}

fn default_admin_password() -> String {
    "admin".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            database_file: default_database_file(),
            secret_key: default_secret_key(),
            admin_password: default_admin_password(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(host = %config.host, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Loads from `path` if it exists, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an existing file is invalid.
    #[instrument(skip(path))]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => Self::from_file(path),
            Some(path) => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Applies `HOST`, `PORT`, `DATA_DIR`, `SECRET_KEY` and `ADMIN_PASSWORD`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `PORT` is not a port number.
    #[instrument(skip(self, lookup))]
    pub fn apply_env(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|e| ConfigError::new(format!("Invalid PORT '{}': {}", port, e)))?;
        }
        if let Some(dir) = lookup("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(secret) = lookup("SECRET_KEY") {
            self.secret_key = secret;
        }
        if let Some(password) = lookup("ADMIN_PASSWORD") {
            self.admin_password = password;
        }
        debug!(host = %self.host, port = self.port, "Environment applied");
        Ok(self)
    }

    /// Overrides the bind address.
    pub fn with_bind(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    /// Overrides the data directory.
    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }

    /// Overrides the admin password.
    pub fn with_admin_password(mut self, password: impl Into<String>) -> Self {
        self.admin_password = password.into();
        self
    }

    /// Overrides the session signing key.
    pub fn with_secret_key(mut self, secret: impl Into<String>) -> Self {
        self.secret_key = secret.into();
        self
    }

    /// Full path of the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

/// Collects game-setting overrides from the environment.
#[instrument(skip(lookup))]
pub fn settings_overrides(lookup: impl Fn(&str) -> Option<String>) -> BTreeMap<String, String> {
    SETTING_KEYS
        .iter()
        .filter_map(|key| lookup(key).map(|value| ((*key).to_string(), value)))
        .collect()
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port(), &8080);
        assert_eq!(config.database_path(), PathBuf::from("data/game.db"));
        assert_eq!(config.admin_password(), "admin");
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::default()
            .apply_env(env(&[("PORT", "9000"), ("ADMIN_PASSWORD", "s3cret")]))
            .unwrap();
        assert_eq!(*config.port(), 9000);
        assert_eq!(config.admin_password(), "s3cret");
    }

    #[test]
    fn test_bad_port_is_rejected() {
        assert!(ServerConfig::default().apply_env(env(&[("PORT", "http")])).is_err());
    }

    #[test]
    fn test_toml_fills_missing_with_defaults() {
        let config: ServerConfig = toml::from_str("port = 3000\nsecret_key = \"abc\"").unwrap();
        assert_eq!(*config.port(), 3000);
        assert_eq!(config.secret_key(), "abc");
        assert_eq!(config.host(), "0.0.0.0");
    }

    #[test]
    fn test_settings_overrides_only_known_keys() {
        let overrides = settings_overrides(env(&[("POINTS_SOLVE", "15"), ("OTHER", "1")]));
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides["POINTS_SOLVE"], "15");
    }
}

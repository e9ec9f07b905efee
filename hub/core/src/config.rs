//! Client Configuration
//!
//! Where the StatusHub server lives and how to talk to it.
//!
//! Sources, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. TOML file (`<config dir>/statushub/config.toml`)
//! 3. Environment variables
//!
//! ```toml
//! root_url = "http://localhost:8080"
//! password = "hunter2"
//! request_timeout_ms = 30000
//! connect_timeout_ms = 10000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable holding the server root URL
pub const ROOT_ENV_VAR: &str = "STATUSHUB_ROOT";
/// Environment variable holding the login password
pub const PASS_ENV_VAR: &str = "STATUSHUB_PASS";
/// Environment variable overriding the HTTP request timeout
pub const REQUEST_TIMEOUT_ENV_VAR: &str = "STATUSHUB_REQUEST_TIMEOUT_MS";
/// Environment variable overriding the WebSocket connect timeout
pub const CONNECT_TIMEOUT_ENV_VAR: &str = "STATUSHUB_CONNECT_TIMEOUT_MS";

/// Errors from loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`HubConfig`]
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// File that failed
        path: PathBuf,
        /// Underlying TOML error
        #[source]
        source: toml::de::Error,
    },

    /// No server URL was configured anywhere
    #[error("missing server URL (set {ROOT_ENV_VAR} or root_url in the config file)")]
    MissingRootUrl,

    /// The server URL is not an http(s) URL
    #[error("invalid server URL {0:?}")]
    InvalidRootUrl(String),

    /// A timeout is zero
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Connection settings for a StatusHub server
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Base URL of the server, e.g. `http://localhost:8080`
    pub root_url: String,
    /// Password used to log in (None = no login)
    pub password: Option<String>,
    /// Timeout for each API request in milliseconds
    pub request_timeout_ms: u64,
    /// Timeout for the WebSocket handshake in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            root_url: String::new(),
            password: None,
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
        }
    }
}

impl HubConfig {
    /// Configuration for a server at `root_url` with default timeouts
    pub fn new(root_url: impl Into<String>) -> Self {
        Self {
            root_url: root_url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables only
    ///
    /// Environment variables:
    /// - `STATUSHUB_ROOT`: server URL
    /// - `STATUSHUB_PASS`: login password
    /// - `STATUSHUB_REQUEST_TIMEOUT_MS`: API request timeout
    /// - `STATUSHUB_CONNECT_TIMEOUT_MS`: WebSocket connect timeout
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields with any environment variables that are set
    pub fn apply_env(&mut self) {
        if let Some(root) = non_empty_env(ROOT_ENV_VAR) {
            self.root_url = root;
        }
        if let Some(pass) = non_empty_env(PASS_ENV_VAR) {
            self.password = Some(pass);
        }
        if let Some(ms) = non_empty_env(REQUEST_TIMEOUT_ENV_VAR).and_then(|v| v.parse().ok()) {
            self.request_timeout_ms = ms;
        }
        if let Some(ms) = non_empty_env(CONNECT_TIMEOUT_ENV_VAR).and_then(|v| v.parse().ok()) {
            self.connect_timeout_ms = ms;
        }
    }

    /// Check that the configuration can be used to reach a server
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRootUrl`] if no URL is set,
    /// [`ConfigError::InvalidRootUrl`] if it is not an http(s) URL, and
    /// [`ConfigError::ZeroTimeout`] if either timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let root = self.root_url.trim();
        if root.is_empty() {
            return Err(ConfigError::MissingRootUrl);
        }
        match reqwest::Url::parse(root) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            _ => return Err(ConfigError::InvalidRootUrl(root.to_string())),
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("request_timeout_ms"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("connect_timeout_ms"));
        }
        Ok(())
    }

    /// API request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// WebSocket handshake timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Default location of the config file
///
/// `$XDG_CONFIG_HOME/statushub/config.toml` on Linux, the platform
/// equivalent elsewhere. None if no config directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("statushub").join("config.toml"))
}

/// Parse a config file without applying environment overrides
///
/// # Errors
///
/// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
pub fn load_config_from_path(path: &Path) -> Result<HubConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the effective configuration
///
/// Reads the default config file if it exists, applies environment
/// overrides, and validates the result.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file exists but cannot be loaded, or if
/// the merged configuration is invalid.
pub fn load_config() -> Result<HubConfig, ConfigError> {
    let mut config = match default_config_path() {
        Some(path) if path.exists() => {
            tracing::debug!(path = %path.display(), "Loading config file");
            load_config_from_path(&path)?
        }
        _ => HubConfig::default(),
    };
    config.apply_env();
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = HubConfig::default();
        assert!(config.root_url.is_empty());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_validate() {
        assert!(matches!(
            HubConfig::default().validate(),
            Err(ConfigError::MissingRootUrl)
        ));
        assert!(matches!(
            HubConfig::new("ftp://example.com").validate(),
            Err(ConfigError::InvalidRootUrl(_))
        ));
        assert!(matches!(
            HubConfig::new("not a url").validate(),
            Err(ConfigError::InvalidRootUrl(_))
        ));
        assert!(HubConfig::new("http://localhost:8080").validate().is_ok());
        assert!(HubConfig::new("https://hub.example.com").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = HubConfig::new("http://localhost:8080");
        config.request_timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroTimeout("request_timeout_ms"))
        ));

        let mut config = HubConfig::new("http://localhost:8080");
        config.connect_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "connect_timeout_ms must be greater than zero");
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"root_url = "http://hub.local:9000""#).unwrap();
        writeln!(file, "connect_timeout_ms = 500").unwrap();

        let config = load_config_from_path(file.path()).unwrap();
        assert_eq!(
            config,
            HubConfig {
                root_url: "http://hub.local:9000".to_string(),
                password: None,
                request_timeout_ms: 30_000,
                connect_timeout_ms: 500,
            }
        );
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "root_url = [").unwrap();

        let err = load_config_from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config_from_path(Path::new("/nonexistent/statushub.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_default_path_shape() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("statushub/config.toml"));
        }
    }
}

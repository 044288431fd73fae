//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::websocket::HubConfig;

/// Largest inbound WebSocket message accepted by default, in bytes
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the web client, served for any unrouted path
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Largest inbound WebSocket message, in bytes; larger ones fail the read
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("web")
}

fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            max_message_size: default_max_message_size(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// First existing file among the default config locations
    pub fn discover() -> Option<PathBuf> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("synced-canvas").join("config.toml")),
            Some(PathBuf::from("/etc/synced-canvas/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        config_paths.into_iter().flatten().find(|path| path.exists())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(host) = std::env::var("SYNCED_CANVAS_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SYNCED_CANVAS_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(dir) = std::env::var("SYNCED_CANVAS_STATIC_DIR") {
            self.server.static_dir = PathBuf::from(dir);
        }
        if let Ok(size) = std::env::var("SYNCED_CANVAS_MAX_MESSAGE_SIZE") {
            if let Ok(s) = size.parse() {
                self.server.max_message_size = s;
            }
        }

        // Hub overrides
        if let Ok(echo) = std::env::var("SYNCED_CANVAS_ECHO_TO_SENDER") {
            self.hub.echo_to_sender = echo.to_lowercase() != "false" && echo != "0";
        }

        // Logging overrides
        if let Ok(level) = std::env::var("SYNCED_CANVAS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SYNCED_CANVAS_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Synced Canvas Configuration
#
# Environment variables override these settings:
# - SYNCED_CANVAS_HOST
# - SYNCED_CANVAS_PORT
# - SYNCED_CANVAS_STATIC_DIR
# - SYNCED_CANVAS_MAX_MESSAGE_SIZE
# - SYNCED_CANVAS_ECHO_TO_SENDER
# - SYNCED_CANVAS_LOG_LEVEL
# - SYNCED_CANVAS_LOG_FORMAT

[server]
# Address to listen on
host = "0.0.0.0"
port = 8080

# Web client served for every path not handled by the API
static_dir = "web"

# Largest inbound WebSocket message (bytes)
max_message_size = 65536

[hub]
# Send each stroke back to the client that drew it
echo_to_sender = true

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

//! TOML-based configuration for the chat server.
//!
//! Every field has a default, so the server runs without any config file and
//! a partial file only needs to mention what it changes:
//!
//! ```toml
//! [network]
//! bind_address = "0.0.0.0"
//! port = 3500
//!
//! [chat]
//! max_username_length = 20
//! write_timeout_ms = 2000
//!
//! [logging]
//! event_log_path = "chatingo.log"
//! log_level = "info"
//! ```
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chatingo_core::MAX_USERNAME_LENGTH;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `bind_address:port` is not a valid socket address.
    #[error("invalid listen address '{addr}': {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// A value parsed but makes no sense.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listen address settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// IP address to bind to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port peers connect to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Chat behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatConfig {
    /// Longest accepted display name, in characters.
    #[serde(default = "default_max_username_length")]
    pub max_username_length: usize,
    /// Deadline for one broadcast write to one peer, in milliseconds.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

/// Event log and diagnostics settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// File that join/leave/message events are appended to.
    #[serde(default = "default_event_log_path")]
    pub event_log_path: PathBuf,
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3500
}
fn default_max_username_length() -> usize {
    MAX_USERNAME_LENGTH
}
fn default_write_timeout_ms() -> u64 {
    2000
}
fn default_event_log_path() -> PathBuf {
    PathBuf::from("chatingo.log")
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_username_length: default_max_username_length(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            event_log_path: default_event_log_path(),
            log_level: default_log_level(),
        }
    }
}

impl NetworkConfig {
    /// Combines `bind_address` and `port` into a socket address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] if `bind_address` is not an IP.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind_address, self.port);
        addr.parse()
            .map_err(|source| ConfigError::InvalidAddress { addr, source })
    }
}

impl ChatConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl ServerConfig {
    /// Rejects values that would make the server unusable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] or [`ConfigError::InvalidAddress`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.network.socket_addr()?;
        if self.chat.max_username_length == 0 {
            return Err(ConfigError::Invalid(
                "chat.max_username_length must be at least 1".to_string(),
            ));
        }
        if self.chat.write_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "chat.write_timeout_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses and validates configuration from TOML text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed TOML and the errors of
/// [`ServerConfig::validate`] for unusable values.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    let cfg: ServerConfig = toml::from_str(content)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Loads configuration from `path`, returning the defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and the errors of [`parse_config`] otherwise.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServerConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! # Configuration Management
//!
//! Structured configuration for the framing layer.
//!
//! Covers both roles, the single-connection connector and the
//! multi-connection server, plus logging. Everything has workable defaults;
//! nothing here is required to get a connection up.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()` / `from_toml()`
//! - Environment-variable overrides via `from_env()`
//! - Direct instantiation with defaults

use crate::core::deframer::DEFAULT_READ_CAPACITY;
use crate::error::{FramingError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Default timeout for outbound connection attempts.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default per-connection idle timeout on the server.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Top-level configuration for both roles.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FramelinkConfig {
    /// Server-role configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Connector-role configuration
    #[serde(default)]
    pub connector: ConnectorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FramelinkConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| FramingError::ConfigError(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| FramingError::ConfigError(format!("failed to parse TOML: {e}")))
    }

    /// Load defaults with environment-variable overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(bind) = std::env::var("FRAMELINK_BIND_ADDRESS") {
            config.server.bind_address = bind;
        }

        if let Ok(idle) = std::env::var("FRAMELINK_IDLE_TIMEOUT_MS") {
            if let Ok(val) = idle.parse::<u64>() {
                config.server.idle_timeout = Some(Duration::from_millis(val));
            }
        }

        if let Ok(timeout) = std::env::var("FRAMELINK_CONNECT_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.connector.connect_timeout = Duration::from_millis(val);
            }
        }

        if let Ok(max) = std::env::var("FRAMELINK_MAX_CONNECTIONS") {
            if let Ok(val) = max.parse::<usize>() {
                config.server.max_connections = val;
            }
        }

        config
    }

    /// Validate the configuration for common misconfigurations.
    ///
    /// Returns a list of problems; an empty list means the configuration is
    /// valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.connector.validate());
        errors
    }

    /// Validate and return `Err` on the first batch of problems.
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(FramingError::ConfigError(format!(
                "configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Server-role configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address the listener binds, without the port (the port is a `start`
    /// argument). The original behavior listens on all interfaces.
    pub bind_address: String,

    /// Initial capacity of each connection's read buffer.
    pub read_buffer_capacity: usize,

    /// Optional ceiling on read-buffer growth per connection. `None`
    /// preserves the unbounded doubling policy; setting it turns a runaway
    /// peer into a connection-local error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_buffer_bytes: Option<usize>,

    /// Idle timeout after which a silent connection is force-disconnected.
    /// `None` disables the idle check.
    #[serde(default, with = "opt_duration_serde", skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<Duration>,

    /// Maximum number of concurrently registered connections. Accepts beyond
    /// this are refused.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: String::from("0.0.0.0"),
            read_buffer_capacity: DEFAULT_READ_CAPACITY,
            max_buffer_bytes: None,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            max_connections: 1024,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.bind_address.is_empty() {
            errors.push("server bind address cannot be empty".to_string());
        } else if self.bind_address.parse::<std::net::IpAddr>().is_err() {
            errors.push(format!(
                "invalid server bind address: '{}' (expected an IP address such as '0.0.0.0')",
                self.bind_address
            ));
        }

        if self.read_buffer_capacity < 2 {
            errors.push("read buffer capacity must hold at least a frame header (2 bytes)".to_string());
        }

        if let Some(limit) = self.max_buffer_bytes {
            if limit < self.read_buffer_capacity {
                errors.push(format!(
                    "max buffer bytes ({limit}) is below the initial read buffer capacity ({})",
                    self.read_buffer_capacity
                ));
            }
        }

        if let Some(idle) = self.idle_timeout {
            if idle.as_millis() < 100 {
                errors.push("idle timeout too short (minimum: 100ms)".to_string());
            }
        }

        if self.max_connections == 0 {
            errors.push("max connections must be greater than 0".to_string());
        }

        errors
    }
}

/// Connector-role configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectorConfig {
    /// Timeout for the outbound connection attempt.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Initial capacity of the read buffer.
    pub read_buffer_capacity: usize,

    /// Optional ceiling on read-buffer growth; see
    /// [`ServerConfig::max_buffer_bytes`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_buffer_bytes: Option<usize>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_buffer_capacity: DEFAULT_READ_CAPACITY,
            max_buffer_bytes: None,
        }
    }
}

impl ConnectorConfig {
    /// Validate connector configuration.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.connect_timeout.as_millis() < 10 {
            errors.push("connect timeout too short (minimum: 10ms)".to_string());
        }

        if self.read_buffer_capacity < 2 {
            errors.push("read buffer capacity must hold at least a frame header (2 bytes)".to_string());
        }

        if let Some(limit) = self.max_buffer_bytes {
            if limit < self.read_buffer_capacity {
                errors.push(format!(
                    "max buffer bytes ({limit}) is below the initial read buffer capacity ({})",
                    self.read_buffer_capacity
                ));
            }
        }

        errors
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level threshold
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to include event targets (module paths) in output
    pub log_targets: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            log_targets: false,
        }
    }
}

/// Helper module for Duration serialization as milliseconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for `Option<Duration>` serialization as milliseconds.
mod opt_duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration
            .map(|d| d.as_millis() as u64)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

/// Helper module for `tracing::Level` serialization/deserialization.
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("invalid log level: {level_str}")))
    }
}

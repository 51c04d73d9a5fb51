//! # Configuration Management
//!
//! Centralized configuration for the object exchange server and client.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`
//!
//! The defaults reproduce the reference deployment: both sides talk to
//! `127.0.0.1:5000`, at most two clients are admitted at once, and every query
//! is answered after a simulated 200-800 ms of processing.

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Default listen/connect address
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:5000";

/// Default cap on concurrently admitted clients
pub const DEFAULT_MAX_CLIENTS: usize = 2;

/// Max allowed frame payload size (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Lower bound of the simulated per-query latency
pub const DEFAULT_QUERY_DELAY_MIN: Duration = Duration::from_millis(200);

/// Upper bound of the simulated per-query latency
pub const DEFAULT_QUERY_DELAY_MAX: Duration = Duration::from_millis(800);

/// Above this many clients the server starts but logs a warning
pub const HIGH_MAX_CLIENTS: usize = 100_000;

/// File the client uses to persist its identifier between runs
pub const DEFAULT_CLIENT_ID_FILE: &str = ".client_counter";

/// Top-level configuration with one section per concern
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppConfig {
    /// Server-specific configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Client-specific configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::Config(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::Config(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::Config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override fields from `OBJECT_EXCHANGE_*` environment variables.
    ///
    /// Unparsable numeric values are reported instead of silently ignored.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("OBJECT_EXCHANGE_SERVER_ADDRESS") {
            self.server.address = addr;
        }

        if let Ok(addr) = std::env::var("OBJECT_EXCHANGE_CLIENT_ADDRESS") {
            self.client.address = addr;
        }

        if let Ok(max) = std::env::var("OBJECT_EXCHANGE_MAX_CLIENTS") {
            self.server.max_clients = parse_env("OBJECT_EXCHANGE_MAX_CLIENTS", &max)?;
        }

        if let Ok(timeout) = std::env::var("OBJECT_EXCHANGE_IDLE_TIMEOUT_MS") {
            let millis: u64 = parse_env("OBJECT_EXCHANGE_IDLE_TIMEOUT_MS", &timeout)?;
            self.server.idle_timeout = Some(Duration::from_millis(millis));
        }

        if let Ok(path) = std::env::var("OBJECT_EXCHANGE_CLIENT_ID_FILE") {
            self.client.id_file = path;
        }

        Ok(())
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::Config(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.client.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::Config(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// `host:port` with a non-empty host and a numeric port. Hostnames are left
/// for the resolver at bind/connect time.
fn is_host_port(address: &str) -> bool {
    if address.parse::<std::net::SocketAddr>().is_ok() {
        return true;
    }
    match address.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty() && !host.contains(char::is_whitespace) && port.parse::<u16>().is_ok()
        }
        None => false,
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| ProtocolError::Config(format!("Invalid value for {name}: '{value}'")))
}

/// Server-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server listen address (e.g., "127.0.0.1:5000")
    pub address: String,

    /// Maximum number of concurrently admitted clients
    pub max_clients: usize,

    /// Lower bound of the simulated per-query delay
    #[serde(with = "duration_serde")]
    pub query_delay_min: Duration,

    /// Upper bound of the simulated per-query delay
    #[serde(with = "duration_serde")]
    pub query_delay_max: Duration,

    /// Optional bound on how long a session may sit idle between frames
    #[serde(
        default,
        with = "option_duration_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub idle_timeout: Option<Duration>,

    /// Largest frame payload a session will accept
    pub max_frame_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from(DEFAULT_ADDRESS),
            max_clients: DEFAULT_MAX_CLIENTS,
            query_delay_min: DEFAULT_QUERY_DELAY_MIN,
            query_delay_max: DEFAULT_QUERY_DELAY_MAX,
            idle_timeout: None,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Server address cannot be empty".to_string());
        } else if !is_host_port(&self.address) {
            errors.push(format!(
                "Invalid server address format: '{}' (expected format: '0.0.0.0:5000')",
                self.address
            ));
        }

        if self.max_clients == 0 {
            errors.push("Max clients must be greater than 0".to_string());
        }

        if self.query_delay_min > self.query_delay_max {
            errors.push(format!(
                "Query delay range is inverted: min {}ms > max {}ms",
                self.query_delay_min.as_millis(),
                self.query_delay_max.as_millis()
            ));
        } else if self.query_delay_max.as_secs() > 60 {
            errors.push("Query delay too long (maximum: 60s)".to_string());
        }

        if let Some(timeout) = self.idle_timeout {
            if timeout.as_millis() < 100 {
                errors.push("Idle timeout too short (minimum: 100ms)".to_string());
            }
        }

        if self.max_frame_size < 1024 {
            errors.push("Max frame size too small (minimum: 1 KB)".to_string());
        } else if self.max_frame_size > u32::MAX as usize {
            errors.push(format!(
                "Max frame size {} exceeds what a 4-byte length prefix can express",
                self.max_frame_size
            ));
        }

        errors
    }

    /// Settings that are legal but worth a second look. Never blocks startup.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.max_clients > HIGH_MAX_CLIENTS {
            warnings.push(format!(
                "Max clients very high: {} (ensure system resources can support this)",
                self.max_clients
            ));
        }

        warnings
    }
}

/// Client-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Target server address
    pub address: String,

    /// File holding the persistent client identifier
    pub id_file: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::from(DEFAULT_ADDRESS),
            id_file: String::from(DEFAULT_CLIENT_ID_FILE),
        }
    }
}

impl ClientConfig {
    /// Validate client configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Client address cannot be empty".to_string());
        } else if !is_host_port(&self.address) {
            errors.push(format!(
                "Invalid client address format: '{}' (expected format: '127.0.0.1:5000')",
                self.address
            ));
        }

        if self.id_file.is_empty() {
            errors.push("Client id file path cannot be empty".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Same as `duration_serde`, for optional values
mod option_duration_serde {
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

/// Helper module for tracing::Level serialization/deserialization
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
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}

//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub mqtt: MqttConfig,

    #[serde(default)]
    pub log: LogSinkConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP / WebSocket server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served for every path other than `/ws` and `/health`
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("./static")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// MQTT message source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_host")]
    pub host: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    #[serde(default = "default_topic")]
    pub topic: String,

    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,

    /// Length of the random uppercase suffix appended to the prefix
    #[serde(default = "default_client_id_suffix_len")]
    pub client_id_suffix_len: usize,

    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    /// Pause after a connection error before polling again
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    /// Capacity of the MQTT client's request channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_mqtt_host() -> String {
    "broker.hivemq.com".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_topic() -> String {
    "sensor/client".to_string()
}

fn default_client_id_prefix() -> String {
    "go-web-mqtt-client-".to_string()
}

fn default_client_id_suffix_len() -> usize {
    5
}

fn default_keep_alive() -> u64 {
    30
}

fn default_reconnect_delay() -> u64 {
    2000
}

fn default_channel_capacity() -> usize {
    10
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            topic: default_topic(),
            client_id_prefix: default_client_id_prefix(),
            client_id_suffix_len: default_client_id_suffix_len(),
            keep_alive_secs: default_keep_alive(),
            reconnect_delay_ms: default_reconnect_delay(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// CSV reading log configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LogSinkConfig {
    #[serde(default = "default_log_path")]
    pub path: PathBuf,

    /// Fsync after each row
    #[serde(default)]
    pub fsync: bool,
}

fn default_log_path() -> PathBuf {
    PathBuf::from("sensor_data.csv")
}

impl Default for LogSinkConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            fsync: false,
        }
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

    /// Load from default locations or environment
    ///
    /// Returns the path the config was read from, or `None` when no default
    /// location holds a file. A file that exists but fails to load is an error.
    pub fn load_default() -> Result<(Self, Option<PathBuf>), ConfigError> {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("sensor-bridge").join("config.toml")),
            Some(PathBuf::from("/etc/sensor-bridge/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        match Self::load_first(&config_paths)? {
            Some((path, config)) => Ok((config, Some(path))),
            None => Ok((Self::from_env(), None)),
        }
    }

    /// Load the first existing file among `paths`, with environment overrides
    pub fn load_first(paths: &[PathBuf]) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        for path in paths {
            if path.exists() {
                let config = Self::load_with_env(path)?;
                return Ok(Some((path.clone(), config)));
            }
        }
        Ok(None)
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(host) = std::env::var("SENSOR_BRIDGE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse("SENSOR_BRIDGE_PORT") {
            self.server.port = port;
        }
        if let Ok(dir) = std::env::var("SENSOR_BRIDGE_STATIC_DIR") {
            self.server.static_dir = PathBuf::from(dir);
        }

        // MQTT overrides
        if let Ok(host) = std::env::var("SENSOR_BRIDGE_MQTT_HOST") {
            self.mqtt.host = host;
        }
        if let Some(port) = env_parse("SENSOR_BRIDGE_MQTT_PORT") {
            self.mqtt.port = port;
        }
        if let Ok(topic) = std::env::var("SENSOR_BRIDGE_MQTT_TOPIC") {
            self.mqtt.topic = topic;
        }

        // Sink overrides
        if let Ok(path) = std::env::var("SENSOR_BRIDGE_LOG_PATH") {
            self.log.path = PathBuf::from(path);
        }

        // Logging overrides
        if let Ok(level) = std::env::var("SENSOR_BRIDGE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SENSOR_BRIDGE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
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
    r#"# Sensor Bridge Configuration
#
# Environment variables override these settings:
# - SENSOR_BRIDGE_HOST
# - SENSOR_BRIDGE_PORT
# - SENSOR_BRIDGE_STATIC_DIR
# - SENSOR_BRIDGE_MQTT_HOST
# - SENSOR_BRIDGE_MQTT_PORT
# - SENSOR_BRIDGE_MQTT_TOPIC
# - SENSOR_BRIDGE_LOG_PATH
# - SENSOR_BRIDGE_LOG_LEVEL
# - SENSOR_BRIDGE_LOG_FORMAT

[server]
# HTTP / WebSocket bind address
host = "0.0.0.0"
port = 8080

# Dashboard assets served for every path except /ws and /health
static_dir = "./static"

[mqtt]
# Broker to subscribe to
host = "broker.hivemq.com"
port = 1883

# Topic carrying sensor readings (QoS 0)
topic = "sensor/client"

# Client ID is the prefix plus a random uppercase suffix
client_id_prefix = "go-web-mqtt-client-"
client_id_suffix_len = 5

# Keep-alive interval (seconds)
keep_alive_secs = 30

# Pause before reconnecting after a connection error (ms)
reconnect_delay_ms = 2000

# Capacity of the MQTT client's request channel
channel_capacity = 10

[log]
# Append-only CSV log of readings
path = "sensor_data.csv"

# Fsync after every row (slower, survives power loss)
fsync = false

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

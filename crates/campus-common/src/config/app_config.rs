//! Application configuration structs
//!
//! Loads configuration from environment variables.

use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: ServerConfig,
    pub connections: ConnectionConfig,
    pub cors: CorsConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Gateway server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Connection registry and dispatch tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Reported connection ceiling. Not enforced by the gateway; admission
    /// control, if any, lives in front of it.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Upper bound for a single send before the recipient is treated as dead
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    /// Interval between liveness sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Outbound message buffer per connection
    #[serde(default = "default_message_buffer")]
    pub message_buffer: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            send_timeout_ms: default_send_timeout_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
            message_buffer: default_message_buffer(),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

// Default value functions
fn default_app_name() -> String {
    "campus-gateway".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_capacity() -> usize {
    1000
}

fn default_send_timeout_ms() -> u64 {
    5000
}

fn default_sweep_interval_secs() -> u64 {
    30
}

fn default_message_buffer() -> usize {
    64
}

/// Parse an optional environment variable
///
/// A missing variable is `Ok(None)`; a present but malformed value is an
/// error rather than a silent fallback to the default.
fn parse_env<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or any
    /// numeric variable fails to parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            gateway: ServerConfig {
                host: env::var("GATEWAY_HOST").unwrap_or_else(|_| default_host()),
                port: parse_env("GATEWAY_PORT")?
                    .ok_or(ConfigError::MissingVar("GATEWAY_PORT"))?,
            },
            connections: ConnectionConfig {
                capacity: parse_env("CONNECTION_CAPACITY")?.unwrap_or_else(default_capacity),
                send_timeout_ms: parse_env("SEND_TIMEOUT_MS")?
                    .unwrap_or_else(default_send_timeout_ms),
                sweep_interval_secs: parse_env("SWEEP_INTERVAL_SECS")?
                    .unwrap_or_else(default_sweep_interval_secs),
                message_buffer: parse_env("MESSAGE_BUFFER_SIZE")?
                    .unwrap_or_else(default_message_buffer),
            },
            cors: CorsConfig {
                allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .ok()
                    .map(|s| s.split(',').map(str::trim).map(String::from).collect())
                    .unwrap_or_default(),
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

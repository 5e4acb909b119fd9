//! Server configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via RIDL_CONFIG)
//! 3. Environment variables

use ridl_protocol::{DEFAULT_PORT, MAX_PAYLOAD_SIZE};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network configuration.
    pub network: NetworkConfig,
    /// The schema and service to serve.
    pub service: ServiceConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("RIDL_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        self.network.apply_env_overrides();
        self.service.apply_env_overrides();
    }

    /// Checks limits that the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.max_connections == 0 {
            return Err(ConfigError::Validation(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.network.max_frame_bytes == 0 || self.network.max_frame_bytes > MAX_PAYLOAD_SIZE {
            return Err(ConfigError::Validation(format!(
                "max_frame_bytes must be between 1 and {}",
                MAX_PAYLOAD_SIZE
            )));
        }
        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Ok(())
    }
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind to.
    #[serde(with = "socket_addr_serde")]
    pub bind_addr: SocketAddr,
    /// Idle connection timeout in seconds.
    pub idle_timeout_secs: u64,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Largest accepted frame payload.
    pub max_frame_bytes: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            idle_timeout_secs: 300,
            max_connections: 1000,
            max_frame_bytes: MAX_PAYLOAD_SIZE,
        }
    }
}

impl NetworkConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("RIDL_BIND") {
            if let Ok(parsed) = addr.parse() {
                self.bind_addr = parsed;
            }
        }

        if let Ok(timeout) = std::env::var("RIDL_IDLE_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.idle_timeout_secs = secs;
            }
        }

        if let Ok(max) = std::env::var("RIDL_MAX_CONNECTIONS") {
            if let Ok(n) = max.parse() {
                self.max_connections = n;
            }
        }

        if let Ok(max) = std::env::var("RIDL_MAX_FRAME_BYTES") {
            if let Ok(n) = max.parse() {
                self.max_frame_bytes = n;
            }
        }
    }

    /// Returns idle timeout as Duration.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Which schema file and service the server exposes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Schema document, JSON or YAML.
    pub schema: Option<PathBuf>,
    /// Service name; may be omitted when the schema declares exactly one.
    pub name: Option<String>,
}

impl ServiceConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("RIDL_SCHEMA") {
            self.schema = Some(PathBuf::from(path));
        }
        if let Ok(name) = std::env::var("RIDL_SERVICE") {
            self.name = Some(name);
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),

    #[error("failed to parse config file '{}': {}", .0.display(), .1)]
    Parse(PathBuf, String),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Custom serde module for SocketAddr (to handle as string in YAML).
mod socket_addr_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::net::SocketAddr;

    pub fn serialize<S>(addr: &SocketAddr, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&addr.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

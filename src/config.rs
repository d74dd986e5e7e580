//! Configuration loading and management.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity.
    pub server: ServerConfig,
    /// Network listen configuration.
    pub listen: ListenConfig,
    /// Core limits and timing.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name (e.g., "chat.example.net").
    pub name: String,
}

/// Network listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind to (e.g., "0.0.0.0:8080").
    pub address: SocketAddr,
}

/// Core limits and timing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Events retained per session outbox (floor of 50 applies).
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
    /// Inactivity before the sweeper evicts a session. Must exceed the
    /// client poll interval by a wide margin to avoid false eviction.
    #[serde(default = "default_stale_threshold_secs")]
    pub stale_threshold_secs: u64,
    /// Sweeper period.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Maximum relayed message length, in characters.
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

fn default_outbox_capacity() -> usize {
    100
}

fn default_stale_threshold_secs() -> u64 {
    75
}

fn default_sweep_interval_secs() -> u64 {
    30
}

fn default_max_message_len() -> usize {
    2000
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: default_outbox_capacity(),
            stale_threshold_secs: default_stale_threshold_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            max_message_len: default_max_message_len(),
        }
    }
}

impl LimitsConfig {
    pub fn stale_threshold(&self) -> Duration {
        Duration::from_secs(self.stale_threshold_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

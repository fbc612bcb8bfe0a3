//! TOML configuration for the device interface.
//!
//! Every field carries a serde default, so a partial file (or none at all)
//! yields a working configuration. Example:
//!
//! ```toml
//! [stream]
//! host = "127.0.0.1"
//! port = 4470
//!
//! [simulator]
//! command = ["fathom-sim"]
//! startup_delay_ms = 200
//!
//! [device]
//! log_level = "debug"
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::DepthClientConfig;

/// Error type for configuration handling.
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

    /// The configured server host is not a valid IP address.
    #[error("invalid server host {0:?}")]
    ServerHost(String),
}

/// Top-level device configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeviceConfig {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub device: DeviceSection,
}

/// Network-stream connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamConfig {
    /// IP address of the depth server.
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port of the depth stream.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bounded attempts for the initial connect.
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    /// Per-attempt connect timeout.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Delay between initial connect attempts.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Delay between reconnect attempts after a drop.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

/// Companion simulator process settings (stream mode only).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulatorConfig {
    /// Command (argv) used to spawn the simulator when no local analog
    /// input is present. Empty means the simulator is already running (or
    /// started externally) and nothing is spawned.
    #[serde(default)]
    pub command: Vec<String>,
    /// Pause after spawning, giving the server a moment to bind.
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,
}

/// General device behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceSection {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    4470
}
fn default_connect_attempts() -> u32 {
    5
}
fn default_connect_timeout_ms() -> u64 {
    100
}
fn default_retry_delay_ms() -> u64 {
    200
}
fn default_reconnect_delay_ms() -> u64 {
    200
}
fn default_startup_delay_ms() -> u64 {
    200
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_attempts: default_connect_attempts(),
            connect_timeout_ms: default_connect_timeout_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            startup_delay_ms: default_startup_delay_ms(),
        }
    }
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl DeviceConfig {
    /// Builds the depth client's connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ServerHost`] if the host does not parse as an
    /// IP address.
    pub fn client_config(&self) -> Result<DepthClientConfig, ConfigError> {
        let ip: IpAddr = self
            .stream
            .host
            .parse()
            .map_err(|_| ConfigError::ServerHost(self.stream.host.clone()))?;
        Ok(DepthClientConfig {
            server_addr: SocketAddr::new(ip, self.stream.port),
            connect_attempts: self.stream.connect_attempts,
            connect_timeout: Duration::from_millis(self.stream.connect_timeout_ms),
            retry_delay: Duration::from_millis(self.stream.retry_delay_ms),
            reconnect_delay: Duration::from_millis(self.stream.reconnect_delay_ms),
        })
    }

    /// Pause applied after spawning the simulator companion.
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.simulator.startup_delay_ms)
    }
}

/// Loads the configuration.
///
/// With no path, returns `DeviceConfig::default()`. With a path, the file
/// must exist and parse.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] or [`ConfigError::Parse`] for an explicit
/// path that cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<DeviceConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(DeviceConfig::default());
    };

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! TOML configuration for the simulator server.
//!
//! Every field carries a serde default, so a partial file (or none at all)
//! yields a working configuration. Example:
//!
//! ```toml
//! [network]
//! bind_address = "127.0.0.1"
//! port = 4470
//!
//! [sim]
//! log_level = "debug"
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

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

    /// The configured bind address is not a valid IP address.
    #[error("invalid bind address {0:?}")]
    BindAddress(String),
}

/// Top-level simulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SimConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub sim: SimSection,
}

/// Listening endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// IP address to bind the listener to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port for the depth stream. Port 0 picks an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// General simulator behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimSection {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    4470
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

impl Default for SimSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl SimConfig {
    /// Resolves the configured listening endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BindAddress`] if the address does not parse.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .network
            .bind_address
            .parse()
            .map_err(|_| ConfigError::BindAddress(self.network.bind_address.clone()))?;
        Ok(SocketAddr::new(ip, self.network.port))
    }
}

/// Loads the configuration.
///
/// With no path, returns `SimConfig::default()` — the simulator is expected
/// to run out of the box. With a path, the file must exist and parse.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] or [`ConfigError::Parse`] for an explicit
/// path that cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<SimConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! fathom-sim library entry point.
//!
//! The simulator server stands in for the Fathom hardware: it holds the
//! authoritative depth value, mutated by a control surface, and pushes every
//! change to all connected clients over TCP. Re-exported here so the binary
//! in `main.rs` and the integration tests in `tests/` share one module tree.

pub mod config;
pub mod server;

pub use config::{load_config, ConfigError, SimConfig};
pub use server::{DepthServer, ServerError};

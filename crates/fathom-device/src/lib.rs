//! fathom-device library entry point.
//!
//! The consumer-facing half of Fathom. A consumer depends on one type,
//! [`Device`](device::Device), which presents the same interface whether the
//! depth signal comes from a local analog input or from the network stream:
//!
//! - **`client`** – [`DepthClient`](client::DepthClient), the TCP mirror of
//!   the simulator's authoritative value (connect with retry, receive loop,
//!   reconnect on drop).
//! - **`axis`** – the [`AxisSource`](axis::AxisSource) abstraction over a
//!   local analog input, plus the mock used by tests and headless builds.
//! - **`device`** – the facade: mode selection at startup, a non-blocking
//!   `depth()` accessor that never fails, and idempotent `close()`.
//! - **`config`** – TOML configuration for all of the above.

pub mod axis;
pub mod client;
pub mod config;
pub mod device;

pub use axis::{AxisSource, MockAxisSource};
pub use client::{ClientError, ClientEvent, DepthClient, DepthClientConfig};
pub use config::{load_config, ConfigError, DeviceConfig};
pub use device::{Device, DeviceMode};

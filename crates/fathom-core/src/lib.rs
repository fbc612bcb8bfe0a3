//! # fathom-core
//!
//! Shared library for Fathom containing the depth domain type, the wire
//! codec, and the thread-safe depth cell.
//!
//! This crate is used by both the simulator server and the device crate.
//! It has zero dependencies on sockets, OS APIs, or the async runtime.
//!
//! Fathom simulates a hardware depth sensor: a single scalar value in
//! `[0, 1024]` that varies continuously and is mirrored from a producer
//! (the simulator server) to any number of consumers over TCP. This crate
//! defines:
//!
//! - **`depth`** – The [`Depth`] value type (clamped to the sensor range)
//!   and the analog-axis mapping used in local mode.
//!
//! - **`wire`** – How depth values travel over the network: ASCII decimal
//!   records, newline-delimited when possible, with a tolerant-tail rule for
//!   unterminated fragments. [`DepthParser`] turns a byte stream back into
//!   values.
//!
//! - **`cell`** – [`DepthCell`], the lock-free shared cell each side stores
//!   its latest value in.

pub mod cell;
pub mod depth;
pub mod wire;

// Re-export the most-used types at the crate root so callers can write
// `fathom_core::Depth` instead of `fathom_core::depth::Depth`.
pub use cell::DepthCell;
pub use depth::{depth_from_axis, Depth, DEPTH_MAX};
pub use wire::{encode_depth, DepthParser, WireError};

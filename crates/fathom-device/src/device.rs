//! The device facade.
//!
//! `Device` presents one interface regardless of where the depth signal
//! comes from. At startup it selects a mode:
//!
//! - **Local mode** — a local analog input was found; every `depth()` call
//!   samples the axis and maps it to the sensor range.
//! - **Stream mode** — no local input; the facade optionally spawns the
//!   simulator companion process and starts a [`DepthClient`] pointed at it.
//!
//! The consumer contract is deliberately narrow: `depth()` always returns an
//! integer in `[0, 1024]`, never blocks beyond an atomic or short lock
//! access, and never fails — a dead stream just keeps returning the
//! last-known value. `close()` is idempotent and swallows (but logs)
//! partial-cleanup failures.
//!
//! State machine: `Uninitialized → Local | Stream(Connecting → Connected ↔
//! Disconnected) → Closed`, with `Closed` terminal.

use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::time;
use tracing::{info, warn};

use fathom_core::depth_from_axis;

use crate::axis::AxisSource;
use crate::client::{ClientEvent, DepthClient, DepthClientConfig};
use crate::config::DeviceConfig;

/// Which signal path the device selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    /// Depth sampled from a local analog input.
    Local,
    /// Depth mirrored from the network stream.
    Stream,
}

enum Backend {
    Local {
        axis: Mutex<Box<dyn AxisSource>>,
    },
    Stream {
        client: DepthClient,
        simulator: Mutex<Option<Child>>,
    },
}

/// The public-facing depth device.
pub struct Device {
    backend: Backend,
    closed: AtomicBool,
}

impl Device {
    /// Initializes the device, selecting local mode when an axis source is
    /// present and stream mode otherwise.
    ///
    /// Never fails: a simulator that cannot be spawned, a config host that
    /// does not parse, or a server that never answers all degrade to a
    /// device that reports the last-known (zero) depth.
    pub async fn initialize(config: DeviceConfig, axis: Option<Box<dyn AxisSource>>) -> Device {
        let backend = match axis {
            Some(source) => {
                info!("local analog input present; using local mode");
                Backend::Local {
                    axis: Mutex::new(source),
                }
            }
            None => {
                info!("no local analog input; using stream mode");
                let simulator = spawn_simulator(&config);
                if simulator.is_some() {
                    // Give the freshly spawned server a moment to bind.
                    time::sleep(config.startup_delay()).await;
                }

                let client_config = config.client_config().unwrap_or_else(|e| {
                    warn!("{e}; falling back to default stream settings");
                    DepthClientConfig::default()
                });
                let client = DepthClient::new(client_config);
                drain_events(client.start());

                Backend::Stream {
                    client,
                    simulator: Mutex::new(simulator),
                }
            }
        };

        Device {
            backend,
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the selected signal path.
    pub fn mode(&self) -> DeviceMode {
        match self.backend {
            Backend::Local { .. } => DeviceMode::Local,
            Backend::Stream { .. } => DeviceMode::Stream,
        }
    }

    /// Returns the current depth, always in `[0, 1024]`.
    ///
    /// Local mode samples the axis on each call (which may pump the input
    /// event queue); stream mode reads the mirrored value. Never blocks on
    /// I/O and never fails.
    pub fn depth(&self) -> u16 {
        match &self.backend {
            Backend::Local { axis } => {
                let mut source = match axis.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                depth_from_axis(source.read_axis()).get()
            }
            Backend::Stream { client, .. } => client.depth().get(),
        }
    }

    /// Releases the device.
    ///
    /// Safe to call multiple times; each cleanup step is attempted
    /// independently and failures are logged, never propagated. After the
    /// first call the device is closed for good.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("closing device");

        match &self.backend {
            Backend::Local { axis } => {
                let mut source = match axis.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                source.stop();
            }
            Backend::Stream { client, simulator } => {
                client.stop();

                let child = match simulator.lock() {
                    Ok(mut guard) => guard.take(),
                    Err(poisoned) => poisoned.into_inner().take(),
                };
                if let Some(mut child) = child {
                    match child.kill() {
                        Ok(()) => {
                            let _ = child.wait();
                            info!("simulator process stopped");
                        }
                        Err(e) => warn!("failed to stop simulator process: {e}"),
                    }
                }
            }
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.close();
    }
}

/// Spawns the configured simulator companion, if any.
fn spawn_simulator(config: &DeviceConfig) -> Option<Child> {
    let argv = &config.simulator.command;
    let program = argv.first()?;

    match Command::new(program)
        .args(&argv[1..])
        .stdin(Stdio::null())
        .spawn()
    {
        Ok(child) => {
            info!(pid = child.id(), "spawned simulator: {program}");
            Some(child)
        }
        Err(e) => {
            // Not fatal: the server may already be running elsewhere.
            warn!("failed to spawn simulator {program:?}: {e}");
            None
        }
    }
}

/// Logs the client's connection lifecycle on the consumer's behalf.
fn drain_events(mut events: tokio::sync::mpsc::Receiver<ClientEvent>) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ClientEvent::Connected { addr } => info!(%addr, "depth stream connected"),
                ClientEvent::Disconnected => warn!("depth stream lost; reconnecting"),
                ClientEvent::ConnectFailed { attempts } => warn!(
                    attempts,
                    "depth stream unavailable; depth stays at the last-known value"
                ),
            }
        }
    });
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Fathom device monitor entry point.
//!
//! Stands in for the rendering consumer: initializes a [`Device`] in stream
//! mode and logs the depth whenever it changes, until Ctrl-C.
//!
//! ```text
//! main()
//!  └─ load_config()        -- optional TOML path as argv[1]
//!  └─ Device::initialize() -- spawns the simulator companion if configured
//!  └─ poll loop            -- log depth on change
//!  └─ Ctrl-C → close()
//! ```
//!
//! A build with a real joystick backend would pass its `AxisSource` to
//! `Device::initialize` instead of `None` and run in local mode; this
//! headless binary always uses the network stream.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fathom_device::{load_config, Device};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref()).context("loading configuration")?;

    // Initialise structured logging. Level comes from the config and is
    // overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.device.log_level.clone())),
        )
        .init();

    info!("fathom-device starting");

    let device = Device::initialize(config, None).await;

    // ── Consumer loop ─────────────────────────────────────────────────────────
    // The poll rate mirrors a render loop; `depth()` itself never blocks.
    let mut poll = tokio::time::interval(Duration::from_millis(50));
    let mut last = None;

    loop {
        tokio::select! {
            _ = poll.tick() => {
                let depth = device.depth();
                if last != Some(depth) {
                    info!(depth, "depth changed");
                    last = Some(depth);
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("waiting for shutdown signal")?;
                info!("shutdown signal received");
                break;
            }
        }
    }

    device.close();
    info!("fathom-device stopped");
    Ok(())
}

//! Fathom simulator entry point.
//!
//! Binds the depth push server and wires a stdin control surface to it:
//! each line of standard input parses as an integer in `[0, 1024]` and
//! becomes the new authoritative depth. A slider UI (or any other control)
//! can drive the server by writing to its stdin.
//!
//! ```text
//! main()
//!  └─ load_config()          -- optional TOML path as argv[1]
//!  └─ DepthServer::bind()    -- fatal on bind failure
//!  └─ stdin pump (Tokio task)
//!  └─ Ctrl-C → stop()
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fathom_sim::{load_config, DepthServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref()).context("loading configuration")?;

    // Initialise structured logging. Level comes from the config and is
    // overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.sim.log_level.clone())),
        )
        .init();

    info!("fathom-sim starting");

    let addr = config.socket_addr()?;
    let server = Arc::new(
        DepthServer::bind(addr)
            .await
            .context("starting depth server")?,
    );

    // ── Control surface ───────────────────────────────────────────────────────
    // One integer per stdin line. Closes quietly on EOF so the server keeps
    // serving the last value when driven by a finite script.
    let control = Arc::clone(&server);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let text = line.trim();
                    if text.is_empty() {
                        continue;
                    }
                    match text.parse::<u32>() {
                        Ok(value) => control.update_depth(value),
                        Err(_) => warn!("control input is not an integer: {text:?}"),
                    }
                }
                Ok(None) => {
                    info!("control input closed");
                    break;
                }
                Err(e) => {
                    warn!("control input error: {e}");
                    break;
                }
            }
        }
    });

    info!(
        "fathom-sim ready on {}; type depth values (0-1024), Ctrl-C to exit",
        server.local_addr()
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutdown signal received");
    server.stop();

    info!("fathom-sim stopped");
    Ok(())
}

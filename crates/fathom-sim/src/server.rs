//! The depth push server.
//!
//! `DepthServer` holds the single authoritative depth value and delivers it
//! to every connected client whenever it changes. Fan-out uses a
//! `tokio::sync::watch` channel: `update_depth` stores into the channel, and
//! each per-client task wakes on change and writes the wire encoding. The
//! watch channel coalesces intermediate values by design — a slow client
//! skips straight to the latest value, which is exactly the protocol's
//! eventual-consistency contract.
//!
//! Failure semantics:
//! - a bind failure is fatal to startup and surfaced to the caller;
//! - accept errors after startup are logged and retried with a short backoff;
//! - a write failure tears down that one client and nothing else.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info, warn};

use fathom_core::{encode_depth, Depth};

/// Pause before retrying a failed `accept` so a transient resource error
/// (e.g. fd exhaustion) does not spin the loop.
const ACCEPT_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Error type for server startup.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening endpoint could not be created. Fatal to startup; the
    /// operator must see this, so it is never silently retried.
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// The simulator's depth push server.
///
/// Holds the authoritative depth value. An external control surface mutates
/// it through [`update_depth`](DepthServer::update_depth); every connected
/// client converges to the latest value.
pub struct DepthServer {
    local_addr: SocketAddr,
    depth_tx: watch::Sender<Depth>,
    shutdown_tx: watch::Sender<bool>,
}

impl DepthServer {
    /// Binds the listening endpoint and starts the accept loop.
    ///
    /// Binding to port 0 picks an ephemeral port; use
    /// [`local_addr`](DepthServer::local_addr) to learn the actual address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address or port is unavailable.
    pub async fn bind(addr: SocketAddr) -> Result<DepthServer, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        let (depth_tx, _) = watch::channel(Depth::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!("depth server listening on {local_addr}");

        tokio::spawn(accept_loop(
            listener,
            depth_tx.clone(),
            shutdown_tx.clone(),
            shutdown_rx,
        ));

        Ok(DepthServer {
            local_addr,
            depth_tx,
            shutdown_tx,
        })
    }

    /// Returns the address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the current authoritative depth value.
    pub fn depth(&self) -> Depth {
        *self.depth_tx.borrow()
    }

    /// Sets the authoritative depth value.
    ///
    /// This is the control-surface entry point (a slider callback, a stdin
    /// pump, a test). The value clamps to the sensor range and is stored
    /// unconditionally; clients are only notified when it actually changed,
    /// so repeated calls with the same value cause no duplicate sends.
    pub fn update_depth(&self, raw: u32) {
        let new = Depth::clamped(raw);
        let changed = self.depth_tx.send_if_modified(|current| {
            let changed = *current != new;
            *current = new;
            changed
        });
        if changed {
            debug!(depth = %new, "authoritative depth updated");
        }
    }

    /// Stops the server: the listener closes and every client connection is
    /// dropped within one task wakeup. Idempotent and callable from any
    /// concurrent context.
    pub fn stop(&self) {
        let was_stopped = self.shutdown_tx.send_replace(true);
        if !was_stopped {
            info!("depth server stopping");
        }
    }
}

impl Drop for DepthServer {
    fn drop(&mut self) {
        // A handle dropped without an explicit stop must still close the
        // listener and tear down the client tasks.
        self.stop();
    }
}

/// Accepts connections until shutdown, spawning one send task per client.
async fn accept_loop(
    listener: TcpListener,
    depth_tx: watch::Sender<Depth>,
    shutdown_tx: watch::Sender<bool>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        // No awaits inside the arm handlers: the `wait_for` guard borrow
        // must end with the select so the future stays `Send`.
        let accepted = tokio::select! {
            _ = shutdown_rx.wait_for(|stop| *stop) => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((stream, peer)) => {
                info!(%peer, "client connected");
                tokio::spawn(client_loop(
                    stream,
                    peer,
                    depth_tx.subscribe(),
                    shutdown_tx.subscribe(),
                ));
            }
            Err(e) => {
                warn!("accept failed: {e}; retrying");
                time::sleep(ACCEPT_RETRY_BACKOFF).await;
            }
        }
    }
    // Dropping the listener here closes the endpoint; later connection
    // attempts are refused.
    info!("listener closed");
}

/// Pushes depth changes to one client until shutdown or a write failure.
async fn client_loop(
    mut stream: TcpStream,
    peer: SocketAddr,
    mut depth_rx: watch::Receiver<Depth>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    // The last value sent to *this* client; `None` forces an initial send so
    // a freshly connected client syncs immediately.
    let mut last_sent: Option<Depth> = None;

    loop {
        let current = *depth_rx.borrow_and_update();

        if last_sent != Some(current) {
            let frame = encode_depth(current);
            let written = tokio::select! {
                _ = shutdown_rx.wait_for(|stop| *stop) => break,
                res = stream.write_all(&frame) => res,
            };
            if let Err(e) = written {
                // Peer gone or unwritable; isolate this client only.
                info!(%peer, "write failed, dropping client: {e}");
                break;
            }
            debug!(%peer, depth = %current, "sent");
            last_sent = Some(current);
            // Re-check: the value may have moved while the write was in
            // flight.
            continue;
        }

        tokio::select! {
            _ = shutdown_rx.wait_for(|stop| *stop) => break,
            changed = depth_rx.changed() => {
                if changed.is_err() {
                    // Server dropped without an explicit stop.
                    break;
                }
            }
        }
    }

    info!(%peer, "client disconnected");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[tokio::test]
    async fn test_bind_reports_ephemeral_port() {
        let server = DepthServer::bind(loopback()).await.expect("bind");
        assert_ne!(server.local_addr().port(), 0);
        server.stop();
    }

    #[tokio::test]
    async fn test_bind_on_occupied_port_is_a_bind_error() {
        let first = DepthServer::bind(loopback()).await.expect("bind");

        let result = DepthServer::bind(first.local_addr()).await;

        assert!(matches!(result, Err(ServerError::Bind { .. })));
        first.stop();
    }

    #[tokio::test]
    async fn test_depth_starts_fully_retracted() {
        let server = DepthServer::bind(loopback()).await.expect("bind");
        assert_eq!(server.depth().get(), 0);
        server.stop();
    }

    #[tokio::test]
    async fn test_update_depth_clamps_to_sensor_range() {
        let server = DepthServer::bind(loopback()).await.expect("bind");
        server.update_depth(5000);
        assert_eq!(server.depth().get(), 1024);
        server.stop();
    }

    #[tokio::test]
    async fn test_update_depth_is_idempotent() {
        let server = DepthServer::bind(loopback()).await.expect("bind");
        server.update_depth(300);
        server.update_depth(300);
        assert_eq!(server.depth().get(), 300);
        server.stop();
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let server = DepthServer::bind(loopback()).await.expect("bind");
        server.stop();
        server.stop();
        server.stop();
    }

    #[tokio::test]
    async fn test_dropping_the_handle_closes_the_listener() {
        let server = DepthServer::bind(loopback()).await.expect("bind");
        let addr = server.local_addr();

        drop(server);

        // The accept loop observes the shutdown signal and releases the port.
        time::sleep(Duration::from_millis(100)).await;
        assert!(TcpStream::connect(addr).await.is_err());
    }
}

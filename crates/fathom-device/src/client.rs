//! Network client for the depth stream.
//!
//! `DepthClient` keeps a best-effort live mirror of the simulator's
//! authoritative depth value:
//!
//! - initial connect with a bounded number of attempts, each under a short
//!   timeout — exhausting them degrades to reporting the last-known (zero)
//!   value rather than failing the consumer;
//! - an async receive loop that feeds every read into the wire parser and
//!   stores each successfully parsed record in the shared [`DepthCell`];
//! - reconnect-on-drop: once a connection has been established, losing it
//!   ("cable unplugged") re-enters an indefinite reconnect loop until
//!   [`stop`](DepthClient::stop).
//!
//! No error from this module ever reaches the consumer; everything is
//! handled at the task boundary and reported through `tracing` and the
//! [`ClientEvent`] stream.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time;
use tracing::{debug, info, warn};

use fathom_core::{Depth, DepthCell, DepthParser};

/// Errors reported (never raised to the consumer) by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// All initial connect attempts failed. The client keeps reporting the
    /// last-known value indefinitely.
    #[error("failed to connect to depth server at {addr} after {attempts} attempt(s)")]
    ConnectionFailed { addr: SocketAddr, attempts: u32 },
}

/// Configuration for the client's connection behaviour.
#[derive(Debug, Clone)]
pub struct DepthClientConfig {
    /// Address of the simulator's depth stream.
    pub server_addr: SocketAddr,
    /// Bounded attempts for the *initial* connect.
    pub connect_attempts: u32,
    /// Per-attempt connect timeout.
    pub connect_timeout: Duration,
    /// Delay between initial connect attempts.
    pub retry_delay: Duration,
    /// Delay between reconnect attempts after an established connection
    /// dropped. Reconnection retries indefinitely.
    pub reconnect_delay: Duration,
}

impl Default for DepthClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:4470".parse().expect("valid literal address"),
            connect_attempts: 5,
            connect_timeout: Duration::from_millis(100),
            retry_delay: Duration::from_millis(200),
            reconnect_delay: Duration::from_millis(200),
        }
    }
}

/// Events emitted by the client's background task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The TCP connection was established.
    Connected { addr: SocketAddr },
    /// The initial connect attempts were exhausted; the client gives up.
    ConnectFailed { attempts: u32 },
    /// An established connection was lost; reconnection is in progress.
    Disconnected,
}

/// Outcome of one established connection.
enum Link {
    /// `stop()` was observed; the task must exit.
    Stopped,
    /// The peer closed or the read failed; reconnect.
    Dropped,
}

/// A best-effort live mirror of the server's depth value.
pub struct DepthClient {
    config: DepthClientConfig,
    cell: Arc<DepthCell>,
    shutdown_tx: watch::Sender<bool>,
}

impl DepthClient {
    /// Creates a new (not yet started) client.
    pub fn new(config: DepthClientConfig) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            cell: Arc::new(DepthCell::default()),
            shutdown_tx,
        }
    }

    /// Spawns the background connect-and-receive task.
    ///
    /// Returns the event stream. Events are delivered best-effort: dropping
    /// the receiver is fine, and a receiver that stops draining only loses
    /// events — the task keeps running either way.
    pub fn start(&self) -> mpsc::Receiver<ClientEvent> {
        let (event_tx, event_rx) = mpsc::channel(16);
        let task = ClientTask {
            config: self.config.clone(),
            cell: Arc::clone(&self.cell),
            shutdown_rx: self.shutdown_tx.subscribe(),
            event_tx,
        };
        tokio::spawn(task.run());
        event_rx
    }

    /// Returns the most recently received depth value (zero until the first
    /// record arrives). Non-blocking; never fails.
    pub fn depth(&self) -> Depth {
        self.cell.get()
    }

    /// Stops the background task; the socket (if connected) is dropped
    /// within one suspension point. Idempotent.
    pub fn stop(&self) {
        let was_stopped = self.shutdown_tx.send_replace(true);
        if !was_stopped {
            info!("depth client stopping");
        }
    }
}

/// State owned by the background task.
struct ClientTask {
    config: DepthClientConfig,
    cell: Arc<DepthCell>,
    shutdown_rx: watch::Receiver<bool>,
    event_tx: mpsc::Sender<ClientEvent>,
}

impl ClientTask {
    async fn run(mut self) {
        let addr = self.config.server_addr;

        let Some(mut stream) = self.initial_connect().await else {
            return;
        };

        loop {
            self.emit(ClientEvent::Connected { addr });
            match self.receive(stream).await {
                Link::Stopped => return,
                Link::Dropped => {
                    self.emit(ClientEvent::Disconnected);
                    match self.reconnect().await {
                        Some(next) => stream = next,
                        None => return,
                    }
                }
            }
        }
    }

    /// Bounded initial connect. `None` means stop was observed or the
    /// attempts were exhausted (the latter emits [`ClientEvent::ConnectFailed`]).
    async fn initial_connect(&mut self) -> Option<TcpStream> {
        let addr = self.config.server_addr;

        for attempt in 1..=self.config.connect_attempts {
            if *self.shutdown_rx.borrow() {
                return None;
            }
            if let Some(stream) = self.try_connect().await {
                info!(%addr, attempt, "connected to depth server");
                return Some(stream);
            }
            if self.sleep_or_stop(self.config.retry_delay).await {
                return None;
            }
        }

        let err = ClientError::ConnectionFailed {
            addr,
            attempts: self.config.connect_attempts,
        };
        warn!("{err}; depth stays at the last-known value");
        self.emit(ClientEvent::ConnectFailed {
            attempts: self.config.connect_attempts,
        });
        None
    }

    /// Indefinite reconnect after a drop. `None` only on stop.
    async fn reconnect(&mut self) -> Option<TcpStream> {
        let addr = self.config.server_addr;

        loop {
            if *self.shutdown_rx.borrow() {
                return None;
            }
            if let Some(stream) = self.try_connect().await {
                info!(%addr, "reconnected to depth server");
                return Some(stream);
            }
            if self.sleep_or_stop(self.config.reconnect_delay).await {
                return None;
            }
        }
    }

    /// One connect attempt under the configured timeout.
    async fn try_connect(&self) -> Option<TcpStream> {
        let addr = self.config.server_addr;
        match time::timeout(self.config.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => Some(stream),
            Ok(Err(e)) => {
                debug!(%addr, "connect failed: {e}");
                None
            }
            Err(_) => {
                debug!(%addr, "connect timed out");
                None
            }
        }
    }

    /// Drives one established connection until stop, EOF, or a read error.
    async fn receive(&mut self, mut stream: TcpStream) -> Link {
        let mut parser = DepthParser::new();
        let mut buf = [0u8; 1024];

        loop {
            let read = tokio::select! {
                _ = self.shutdown_rx.wait_for(|stop| *stop) => return Link::Stopped,
                read = stream.read(&mut buf) => read,
            };

            match read {
                Ok(0) => {
                    info!("depth server closed the connection");
                    return Link::Dropped;
                }
                Ok(n) => {
                    for record in parser.feed(&buf[..n]) {
                        match record {
                            Ok(depth) => {
                                debug!(%depth, "depth update");
                                self.cell.set(depth);
                            }
                            // Dropped, never reverts the mirror.
                            Err(e) => warn!("{e}"),
                        }
                    }
                }
                Err(e) => {
                    warn!("read error on depth stream: {e}");
                    return Link::Dropped;
                }
            }
        }
    }

    /// Sleeps for `delay` unless stop arrives first. Returns `true` on stop.
    async fn sleep_or_stop(&mut self, delay: Duration) -> bool {
        tokio::select! {
            _ = self.shutdown_rx.wait_for(|stop| *stop) => true,
            _ = time::sleep(delay) => false,
        }
    }

    fn emit(&self, event: ClientEvent) {
        // Best-effort; a full or dropped receiver must never block the task,
        // or a consumer that stops draining events could wedge it and mask a
        // later stop().
        if let Err(mpsc::error::TrySendError::Full(dropped)) = self.event_tx.try_send(event) {
            debug!(?dropped, "event channel full; lifecycle event dropped");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
